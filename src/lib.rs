//! Models Builder
//!
//! Generates strongly typed C# model classes from a content platform's
//! content-type schema, without clobbering hand-written partial classes.
//!
//! ## Features
//!
//! - **Type Graph**: content, media and member types with parents and compositions
//! - **Placement**: namespaces and directories by kind and composition status
//! - **Partial Awareness**: members declared in `X.cs` are never generated into `X.generated.cs`
//! - **Safe Rebuilds**: only files carrying the generator signature are deleted
//! - **Extensibility**: settings hooks, models hooks and programmatic containers
//!
//! ## Pipeline
//!
//! ```text
//! schema.json ─► model::builder ─► model::normalize ─► hooks
//!                                                        │
//!        X.cs ─► analysis ────────────────────────────► codegen ─► X.generated.cs
//! ```
//!
//! ## Output layout
//!
//! ```text
//! umbraco/models/
//! ├── Content/
//! │   ├── Compositions/
//! │   │   └── SeoComposition.generated.cs
//! │   ├── Article.generated.cs
//! │   └── Article.cs            (hand-written, optional)
//! ├── Elements/
//! ├── Media/
//! ├── Members/
//! └── lastBuild.flag
//! ```

pub mod analysis;
pub mod build;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod schema;

pub use analysis::{ClassSummary, FileSummary};
pub use build::{BuildReport, FileOutOfDateStatus, ModelsBuilder, OutOfDateStatus, StatusResult};
pub use codegen::SourceGenerator;
pub use config::{GeneratorSettings, ModelsBuilderConfig, ModelsMode};
pub use error::{BuildError, Result};
pub use generator::ModelsGenerator;
pub use model::{PropertyModel, TypeId, TypeModel, TypeModelList, ValueType};
pub use schema::{JsonSchemaSource, SchemaSource};
