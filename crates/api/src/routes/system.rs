use std::collections::BTreeMap;
use std::time::Duration;

use axum::{Json, extract::State};
use serde::Serialize;
use subforge_transcription::languages::LANGUAGES;
use sysinfo::System;
use tracing::{debug, warn};

use crate::state::AppState;

const OLLAMA_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub models: Vec<String>,
    pub languages: BTreeMap<&'static str, &'static str>,
    pub extensions: Vec<String>,
}

pub async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        models: state.settings.transcription.models.clone(),
        languages: LANGUAGES.iter().copied().collect(),
        extensions: state.settings.transcription.supported_extensions.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ffmpeg: bool,
    pub ollama: bool,
    pub pyannote: bool,
}

/// Availability of the external tools and services the pipeline relies on.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let url = format!("{}/api/tags", state.settings.translation.ollama_base());
    let ollama = match state.http.get(&url).timeout(OLLAMA_PROBE_TIMEOUT).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(%url, %e, "Ollama probe failed");
            false
        }
    };

    Json(HealthResponse {
        ffmpeg: state.converter.is_available(),
        ollama,
        pyannote: state.diarizer.is_configured(),
    })
}

#[derive(Debug, Serialize)]
pub struct Hardware {
    pub ram_gb: f64,
    pub cpu_cores: usize,
    pub gpu: String,
    pub gpu_vram_gb: f64,
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub whisper_base: String,
    pub whisper_large: String,
    pub diarization: String,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkResponse {
    pub hardware: Hardware,
    pub recommendations: Recommendations,
}

pub async fn benchmark(State(state): State<AppState>) -> Json<BenchmarkResponse> {
    // A full refresh walks the process table; keep it off the executor.
    let (total_memory, cpu_cores) = tokio::task::spawn_blocking(|| {
        let sys = System::new_all();
        (sys.total_memory(), sys.cpus().len())
    })
    .await
    .unwrap_or_else(|e| {
        warn!(%e, "Host probe failed");
        (0, 0)
    });
    let ram_gb = total_memory as f64 / 1_073_741_824.0;

    Json(BenchmarkResponse {
        hardware: Hardware {
            ram_gb: (ram_gb * 10.0).round() / 10.0,
            cpu_cores,
            gpu: "None".to_string(),
            gpu_vram_gb: 0.0,
            backend: state.models.backend().to_string(),
        },
        recommendations: recommend(ram_gb),
    })
}

/// CPU-only sizing advice from total RAM.
fn recommend(ram_gb: f64) -> Recommendations {
    let whisper_large = if ram_gb >= 16.0 {
        "Good"
    } else {
        "Slow (Not enough RAM/VRAM)"
    };
    let diarization = if ram_gb >= 8.0 {
        "Slow but usable (CPU mode)"
    } else {
        "Not recommended (will likely crash or take hours)"
    };

    Recommendations {
        whisper_base: "Good".to_string(),
        whisper_large: whisper_large.to_string(),
        diarization: diarization.to_string(),
    }
}
