pub mod constraints;
pub mod dedupe;
pub mod error;
pub mod extract;
pub mod filter;
pub mod frame_utils;
pub mod graph;
pub mod keys;
pub mod linker;
pub mod merge;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod translate;
pub mod unnest;

pub use constraints::{
    CardinalityValidator, ConstraintValidator, ConstraintViolation, NullKeysValidator,
    RowDecreaseValidator, SAMPLE_LIMIT, UniqueKeysValidator, UnmatchedLeftValidator,
    UnmatchedRightValidator, ValidationContext, ValidationStage, ValidatorRegistry,
    ViolationDetail, build_default_registry, default_registry,
};
pub use dedupe::drop_duplicates;
pub use error::{PipelineError, PipelineStage};
pub use extract::{DefaultExtractor, ExtractError, Extractor};
pub use filter::{FilterError, apply_filter};
pub use graph::{GraphError, ProcessState};
pub use keys::{check_surrogate_id, check_unique, ensure_surrogate_id};
pub use linker::{LinkError, LinkOutcome, LinkRequest, Linker};
pub use merge::{JoinKeys, MergeIndicator, MergeResult, MergeSpec, merge, merge_with_keys};
pub use normalizer::{EntityReport, Normalizer, RunOutput};
pub use pipeline::{
    DedupeStep, EntityPipeline, EntityStep, ExtractStep, FilterStep, KeyCheckStep, LinkStep,
    StepContext, StepState, SurrogateIdStep, TranslateStep, UnnestStep, build_default_pipeline,
};
pub use store::{StoreError, TableStore};
pub use translate::translate;
pub use unnest::{UnnestError, Unnested, unnest};
