//! Shared plumbing for the `ump` command line.

use asr::{AsrConfig, AsrPipeline};
use clap::ValueEnum;
use llm::{LlmConfig, LlmPipeline};
use memory::{MilvusConfig, MilvusPipeline};
use pipeline::config::env_or;
use pipeline::{PipelineConfig, Result, ServiceState};
use tts::{TtsConfig, TtsPipeline};
use vision::{ImgCapPipeline, OcrPipeline, ShowUiPipeline, VidCapPipeline};

/// A model service the command line can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Service {
    Asr,
    Llm,
    ImgCap,
    Ocr,
    VidCap,
    Tts,
    Showui,
    Milvus,
}

impl Service {
    /// Prefix of the service's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Service::Asr => "ASR",
            Service::Llm => "LLM",
            Service::ImgCap => "IMG_CAP",
            Service::Ocr => "OCR",
            Service::VidCap => "VID_CAP",
            Service::Tts => "TTS",
            Service::Showui => "SHOWUI",
            Service::Milvus => "MILVUS",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Service::Asr => asr::DEFAULT_URL,
            Service::Llm => llm::config::DEFAULT_URL,
            Service::ImgCap => vision::img_cap::DEFAULT_URL,
            Service::Ocr => vision::ocr::DEFAULT_URL,
            Service::VidCap => vision::vid_cap::DEFAULT_URL,
            Service::Tts => tts::DEFAULT_URL,
            Service::Showui => vision::vla::DEFAULT_URL,
            Service::Milvus => memory::DEFAULT_URL,
        }
    }
}

/// Server address from the CLI, else `<PREFIX>_URL`, else the default.
pub fn server_url(service: Service, cli: Option<&str>) -> String {
    match cli {
        Some(url) => url.to_string(),
        None => env_or(
            &format!("{}_URL", service.env_prefix()),
            service.default_url(),
        ),
    }
}

fn plain(service: Service, url: Option<&str>) -> PipelineConfig {
    let mut config = PipelineConfig::from_env(service.env_prefix(), service.default_url());
    config.server_url = server_url(service, url);
    config
}

pub fn asr(url: Option<&str>) -> Result<AsrPipeline> {
    let mut config = AsrConfig::from_env();
    config.server_url = server_url(Service::Asr, url);
    AsrPipeline::new(&config)
}

pub fn llm(url: Option<&str>) -> Result<LlmPipeline> {
    let mut config = LlmConfig::from_env();
    config.server_url = server_url(Service::Llm, url);
    LlmPipeline::new(&config)
}

pub fn tts(url: Option<&str>) -> Result<TtsPipeline> {
    let mut config = TtsConfig::from_env();
    config.server_url = server_url(Service::Tts, url);
    TtsPipeline::new(&config)
}

pub fn img_cap(url: Option<&str>) -> Result<ImgCapPipeline> {
    ImgCapPipeline::new(&plain(Service::ImgCap, url))
}

pub fn ocr(url: Option<&str>) -> Result<OcrPipeline> {
    OcrPipeline::new(&plain(Service::Ocr, url))
}

pub fn vid_cap(url: Option<&str>) -> Result<VidCapPipeline> {
    VidCapPipeline::new(&plain(Service::VidCap, url))
}

pub fn show_ui(url: Option<&str>) -> Result<ShowUiPipeline> {
    ShowUiPipeline::new(&plain(Service::Showui, url))
}

pub fn milvus(url: Option<&str>) -> Result<MilvusPipeline> {
    let mut config = MilvusConfig::from_env();
    config.server_url = server_url(Service::Milvus, url);
    MilvusPipeline::new(&config)
}

/// Probe `service`. Only a disabled or misconfigured service fails; a
/// server that cannot be reached reports an unknown state.
pub async fn probe(service: Service, url: Option<&str>) -> Result<ServiceState> {
    Ok(match service {
        Service::Asr => asr(url)?.check_state().await,
        Service::Llm => llm(url)?.check_state().await,
        Service::ImgCap => img_cap(url)?.check_state().await,
        Service::Ocr => ocr(url)?.check_state().await,
        Service::VidCap => vid_cap(url)?.check_state().await,
        Service::Tts => tts(url)?.check_state().await,
        Service::Showui => show_ui(url)?.check_state().await,
        Service::Milvus => milvus(url)?.check_state().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn cli_overrides_env() {
        env::set_var("VID_CAP_URL", "http://10.0.0.5:11005");
        assert_eq!(
            server_url(Service::VidCap, Some("http://gpu:9000")),
            "http://gpu:9000"
        );
        assert_eq!(server_url(Service::VidCap, None), "http://10.0.0.5:11005");
        env::remove_var("VID_CAP_URL");
    }

    #[test]
    fn default_when_missing() {
        env::remove_var("SHOWUI_URL");
        assert_eq!(server_url(Service::Showui, None), "http://127.0.0.1:11009");
    }

    #[test]
    fn service_names_on_the_command_line() {
        assert_eq!(Service::from_str("img-cap", true), Ok(Service::ImgCap));
        assert_eq!(Service::from_str("milvus", true), Ok(Service::Milvus));
    }
}
