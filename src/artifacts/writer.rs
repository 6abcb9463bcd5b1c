//! Drives every artifact builder in this module to disk under `data/`
//! (spec §4.J), atomically and in one pass over the final record set.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::io_util::atomic_write_json_sorted;
use crate::types::ModelRecord;

use super::{families, legacy, models, models_light, search_index, statistics};

pub async fn write_all(
    records: &[ModelRecord],
    data_dir: &Path,
    generated_at: DateTime<Utc>,
) -> Result<(), std::io::Error> {
    let models_artifact = models::build(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("models.json"), &models_artifact).await?;

    let light_artifact = models_light::build(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("models-light.json"), &light_artifact).await?;

    let search_artifact = search_index::build(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("search-index.json"), &search_artifact).await?;

    let stats_artifact = statistics::build(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("statistics.json"), &stats_artifact).await?;

    let families_artifact = families::build_families(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("families.json"), &families_artifact).await?;

    let architectures_artifact = families::build_architectures(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("architectures.json"), &architectures_artifact).await?;

    let quantizations_artifact = families::build_quantizations(records, generated_at);
    atomic_write_json_sorted(&data_dir.join("quantizations.json"), &quantizations_artifact).await?;

    let gguf_models = legacy::build_gguf_models(records);
    let legacy_root = data_dir.parent().unwrap_or(data_dir);
    atomic_write_json_sorted(&legacy_root.join("gguf_models.json"), &gguf_models).await?;

    let estimated_sizes = legacy::build_estimated_sizes(records);
    atomic_write_json_sorted(&legacy_root.join("gguf_models_estimated_sizes.json"), &estimated_sizes).await?;

    Ok(())
}
