//! Service layer for discovery-service
//!
//! Ranking pipeline, leaves first:
//! - visibility: eligibility predicate shared with the store query
//! - profile: viewer preference inference + LRU preference cache
//! - scorer / diversity: composite scoring and near-tie shuffling
//! - fallback_chain: SCORED -> EXTENDED_WINDOW -> RANDOM_SAMPLE -> EMERGENCY_ANY
//! - composer: home feed and standalone section entrypoints
//! - view_recorder: detached view counting
//! - trending_panel: TTL-cached trending-search panel

pub mod composer;
pub mod diversity;
pub mod fallback_chain;
pub mod profile;
pub mod scorer;
pub mod trending_panel;
pub mod view_recorder;
pub mod visibility;
pub mod weights;

pub use composer::{
    DefaultPackViewMapper, FeedComposer, FeedRequest, HomeFeed, PackViewMapper, SectionFeed,
    SuggestedPage,
};
pub use diversity::DiversityShuffler;
pub use fallback_chain::{ChainOutcome, FallbackChain, FallbackTier};
pub use profile::{InteractionProfile, InteractionProfileBuilder, PreferenceCache, ProfileService};
pub use scorer::{CandidateScorer, ScoredCandidate};
pub use trending_panel::{TrendingPanelCache, TrendingPanelResponse, TrendingPanelService};
pub use view_recorder::ViewRecorder;
pub use visibility::VisibilityFilter;
pub use weights::{
    FixedWeightSampler, RngWeightSampler, SectionProfile, WeightRange, WeightRanges,
    WeightSampler,
};
