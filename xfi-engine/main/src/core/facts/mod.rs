pub mod dependency;
pub mod file_analysis;
pub mod openai;
pub mod structure;

use crate::core::almanac::FactDef;

/// The static fact catalog; the loader filters this by archetype.
pub fn builtin_facts() -> Vec<FactDef> {
    vec![
        file_analysis::repo_file_analysis(),
        dependency::repo_dependency_analysis(),
        structure::repo_directory_structure(),
        openai::openai_analysis(),
    ]
}
