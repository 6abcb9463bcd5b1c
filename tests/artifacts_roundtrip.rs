//! P7 (schema round-trip): every persisted JSON artifact, reparsed, equals
//! what was written, and `data/models.json` carries the set of fields the
//! static site depends on.

use std::collections::HashSet;

use chrono::Utc;
use gguf_sync::artifacts::write_all;
use gguf_sync::types::{FileRecord, ModelRecord};

fn sample_records() -> Vec<ModelRecord> {
    let mut records = vec![
        ModelRecord {
            id: "TheBloke/Llama-3-8B-GGUF".to_string(),
            name: "Llama 3 8B".to_string(),
            family: "TheBloke".to_string(),
            architecture: "Llama".to_string(),
            files: vec![
                FileRecord {
                    filename: "llama-3-8b.Q4_K_M.gguf".to_string(),
                    size_bytes: 4_000_000,
                    size_human: "3.81 MB".to_string(),
                    quantization: "Q4_K_M".to_string(),
                    download_url: "https://huggingface.co/llama-3-8b.Q4_K_M.gguf".to_string(),
                    last_modified: Some(Utc::now()),
                },
                FileRecord {
                    filename: "llama-3-8b.Q8_0.gguf".to_string(),
                    size_bytes: 8_000_000,
                    size_human: "7.63 MB".to_string(),
                    quantization: "Q8_0".to_string(),
                    download_url: "https://huggingface.co/llama-3-8b.Q8_0.gguf".to_string(),
                    last_modified: Some(Utc::now()),
                },
            ],
            downloads: 12_345,
            tags: HashSet::from(["llama".to_string(), "gguf".to_string()]),
            total_size_bytes: 12_000_000,
            quantizations: HashSet::from(["Q4_K_M".to_string(), "Q8_0".to_string()]),
            last_modified: Some(Utc::now()),
            created_at: Some(Utc::now() - chrono::Duration::days(3)),
            discovery_method: vec!["primary".to_string()],
            confidence_score: 1.0,
            validation: None,
            freshness: None,
        },
        ModelRecord {
            id: "bartowski/Mistral-7B-GGUF".to_string(),
            name: "Mistral 7B".to_string(),
            family: "bartowski".to_string(),
            architecture: "Mistral".to_string(),
            files: vec![FileRecord {
                filename: "mistral-7b.F16.gguf".to_string(),
                size_bytes: 14_000_000,
                size_human: "13.35 MB".to_string(),
                quantization: "F16".to_string(),
                download_url: "https://huggingface.co/mistral-7b.F16.gguf".to_string(),
                last_modified: None,
            }],
            downloads: 500,
            tags: HashSet::from(["mistral".to_string()]),
            total_size_bytes: 14_000_000,
            quantizations: HashSet::from(["F16".to_string()]),
            last_modified: None,
            created_at: None,
            discovery_method: vec!["organization_crawl".to_string()],
            confidence_score: 0.9,
            validation: None,
            freshness: None,
        },
    ];
    for record in &mut records {
        record.sort_files_by_size_desc();
    }
    records
}

#[tokio::test]
async fn every_artifact_round_trips_and_files_stay_sorted_by_size() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    tokio::fs::create_dir_all(&data_dir).await.unwrap();

    let records = sample_records();
    write_all(&records, &data_dir, Utc::now()).await.unwrap();

    for name in [
        "models.json",
        "models-light.json",
        "search-index.json",
        "statistics.json",
        "families.json",
        "architectures.json",
        "quantizations.json",
    ] {
        let path = data_dir.join(name);
        let bytes = tokio::fs::read(&path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).expect("artifact must be valid JSON");
        let re_serialized = serde_json::to_vec(&parsed).unwrap();
        let re_parsed: serde_json::Value = serde_json::from_slice(&re_serialized).unwrap();
        assert_eq!(parsed, re_parsed, "{name} did not round-trip");
    }

    let legacy_root = dir.path();
    for name in ["gguf_models.json", "gguf_models_estimated_sizes.json"] {
        let bytes = tokio::fs::read(legacy_root.join(name)).await.unwrap();
        let _: serde_json::Value = serde_json::from_slice(&bytes).expect("legacy artifact must be valid JSON");
    }

    let models_json: serde_json::Value =
        serde_json::from_slice(&tokio::fs::read(data_dir.join("models.json")).await.unwrap()).unwrap();
    let models = models_json["models"].as_array().unwrap();
    let llama = models.iter().find(|m| m["id"] == "TheBloke/Llama-3-8B-GGUF").unwrap();
    let files = llama["files"].as_array().unwrap();
    assert_eq!(files[0]["sizeBytes"], 8_000_000);
    assert_eq!(files[1]["sizeBytes"], 4_000_000);
}
