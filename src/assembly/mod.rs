//! Document assembly: answers → placeholder bag → document text

pub mod analysis;
pub mod clauses;
pub mod derived;
pub mod format;
pub mod generator;
pub mod mapping;
pub mod rules;

pub use analysis::{analyze_rent_dispute, ReadinessReport};
pub use clauses::{assemble_clauses, AssembledClause, ClauseAssembly};
pub use derived::EconomicStatus;
pub use generator::{
    case_number, DocumentGenerator, GenerateError, GeneratedDocument, GenerationContext,
};
pub use mapping::{map_answers, AnswerBag};
pub use rules::{check_rules, select_clauses, ClauseRule, ClauseSelection};
