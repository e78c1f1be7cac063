//! Plugin Registration
//!
//! Describes the plugin and the signatures of its actions as plain values,
//! built once at startup and queried by the `describe` command.

use crate::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Bibliography entry attached to the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub key: String,
    pub reference: Option<String>,
}

/// Plugin identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub website: String,
    pub package: String,
    pub description: String,
    pub short_description: String,
    pub user_support_text: String,
    pub citations: Vec<Citation>,
}

impl PluginInfo {
    pub fn microbiome_age() -> Self {
        Self {
            name: "microbiome_age".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website: "http://www.github.com/shihuang047/q2_microbiome_age".to_string(),
            package: "q2_microbiome_age".to_string(),
            description: "This QIIME 2 plugin performs the age prediction for microbiome data \
                          in the context of AGP data."
                .to_string(),
            short_description: "Age prediction based on microbiome data.".to_string(),
            user_support_text: "Raise an issue on the github repo: \
                                https://github.com/shihuang047/q2_microbiome_age"
                .to_string(),
            citations: vec![Citation {
                key: "agepred2020shi".to_string(),
                reference: None,
            }],
        }
    }
}

/// Type tags for action inputs, parameters and outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    RelativeFrequencyTable,
    SampleMetadata,
    NumericMetadataColumn,
    AgeRegressorModel,
    AlignmentReport,
    Int,
    Float,
    Str,
    Bool,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::RelativeFrequencyTable => "FeatureTable[RelativeFrequency]",
            SemanticType::SampleMetadata => "Metadata",
            SemanticType::NumericMetadataColumn => "MetadataColumn[Numeric]",
            SemanticType::AgeRegressorModel => "SampleEstimator[Regressor]",
            SemanticType::AlignmentReport => "AlignmentReport",
            SemanticType::Int => "Int",
            SemanticType::Float => "Float",
            SemanticType::Str => "Str",
            SemanticType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// One named slot of an action signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub semantic_type: SemanticType,
    pub description: String,
    /// Rendered default; `None` means the slot is required
    pub default: Option<String>,
}

/// Inputs, parameters and outputs of a registered action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSignature {
    pub id: String,
    pub name: String,
    pub description: String,
    pub inputs: BTreeMap<String, ParameterSpec>,
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub outputs: BTreeMap<String, ParameterSpec>,
}

impl ActionSignature {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            inputs: BTreeMap::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn input(mut self, name: &str, semantic_type: SemanticType, description: &str) -> Self {
        self.inputs
            .insert(name.to_string(), slot(semantic_type, description, None));
        self
    }

    pub fn parameter(
        mut self,
        name: &str,
        semantic_type: SemanticType,
        description: &str,
        default: Option<&str>,
    ) -> Self {
        self.parameters
            .insert(name.to_string(), slot(semantic_type, description, default));
        self
    }

    pub fn output(mut self, name: &str, semantic_type: SemanticType, description: &str) -> Self {
        self.outputs
            .insert(name.to_string(), slot(semantic_type, description, None));
        self
    }
}

fn slot(semantic_type: SemanticType, description: &str, default: Option<&str>) -> ParameterSpec {
    ParameterSpec {
        semantic_type,
        description: description.to_string(),
        default: default.map(str::to_string),
    }
}

/// Action signatures keyed by id
#[derive(Debug, Clone, Serialize)]
pub struct ActionRegistry {
    plugin: PluginInfo,
    actions: BTreeMap<String, ActionSignature>,
}

impl ActionRegistry {
    pub fn new(plugin: PluginInfo) -> Self {
        Self {
            plugin,
            actions: BTreeMap::new(),
        }
    }

    /// Register an action; ids must be unique
    pub fn register(&mut self, action: ActionSignature) -> Result<(), PipelineError> {
        if self.actions.contains_key(&action.id) {
            return Err(PipelineError::DuplicateAction(action.id));
        }
        debug!("Registered action {}", action.id);
        self.actions.insert(action.id.clone(), action);
        Ok(())
    }

    pub fn plugin(&self) -> &PluginInfo {
        &self.plugin
    }

    pub fn get(&self, id: &str) -> Option<&ActionSignature> {
        self.actions.get(id)
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionSignature> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

const TABLE_HELP: &str = "The feature table containing the samples which will be used for age prediction.";

/// Registry with every action this plugin provides
pub fn microbiome_age_registry(plugin: PluginInfo) -> Result<ActionRegistry, PipelineError> {
    let mut registry = ActionRegistry::new(plugin);

    registry.register(
        ActionSignature::new(
            "pad-features-in-test-data",
            "Pad features in test data",
            "Reshape a test table onto the feature axis of a training table: shared \
             features are kept, missing ones are zero-filled and extra ones dropped.",
        )
        .input("train_table", SemanticType::RelativeFrequencyTable, "Table defining the feature axis.")
        .input("test_table", SemanticType::RelativeFrequencyTable, "Table to align.")
        .output("padded_table", SemanticType::RelativeFrequencyTable, "Test table on the training feature axis.")
        .output("report", SemanticType::AlignmentReport, "Shared, padded and dropped features."),
    )?;

    registry.register(
        ActionSignature::new(
            "age-prediction-with-train-data",
            "Microbiome age prediction",
            "Train a random forest age regressor on the training table and insert \
             predicted ages for the test samples into the test metadata.",
        )
        .input("train_table", SemanticType::RelativeFrequencyTable, TABLE_HELP)
        .input("test_table", SemanticType::RelativeFrequencyTable, TABLE_HELP)
        .input("train_metadata", SemanticType::SampleMetadata, "Metadata holding the known ages of the training samples.")
        .input("test_metadata", SemanticType::SampleMetadata, "Metadata the predicted ages are inserted into.")
        .parameter("target_field", SemanticType::Str, "Numeric metadata column with the known age.", Some("age"))
        .parameter("n_estimators", SemanticType::Int, "Number of trees in the forest.", Some("500"))
        .parameter("n_jobs", SemanticType::Int, "Worker threads; 0 uses every core.", Some("4"))
        .parameter("seed", SemanticType::Int, "Random seed.", Some("42"))
        .output("model", SemanticType::AgeRegressorModel, "The trained age regressor.")
        .output("updated_metadata", SemanticType::SampleMetadata, "The microbiome age will be inserted into metadata file."),
    )?;

    registry.register(
        ActionSignature::new(
            "age-prediction-with-trained-model",
            "Microbiome age prediction with a trained model",
            "Align the test table to a previously trained model and insert predicted \
             ages into the test metadata.",
        )
        .input("model", SemanticType::AgeRegressorModel, "A trained age regressor.")
        .input("test_table", SemanticType::RelativeFrequencyTable, TABLE_HELP)
        .input("test_metadata", SemanticType::SampleMetadata, "Metadata the predicted ages are inserted into.")
        .parameter("prediction_column", SemanticType::Str, "Column receiving the predictions.", Some("predicted_age"))
        .output("updated_metadata", SemanticType::SampleMetadata, "The microbiome age will be inserted into metadata file."),
    )?;

    Ok(registry)
}
