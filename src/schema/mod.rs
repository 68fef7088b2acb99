//! Schema system - wizard templates, validation and the step wizard

pub mod condition;
pub mod model;
pub mod registry;
pub mod validator;
pub mod wizard;

pub use condition::{Condition, ConditionOp};
pub use model::{
    CrossFieldRule, FieldConstraints, FieldKind, FieldOption, TemplateMetadata, TemplateProgress,
    WizardField, WizardStep, WizardTemplate,
};
pub use registry::{EmbeddedAssets, TemplateError, TemplateRegistry, TemplateSource};
pub use validator::{FieldViolation, StepValidationError, StepValidator};
pub use wizard::{StepWizard, WizardOutcome, WizardState};
