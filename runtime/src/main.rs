use std::path::PathBuf;

use anyhow::{bail, Context};
use asr::{AsrQuery, AsrStreamQuery};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use futures_util::StreamExt;
use llm::{collect_stream, Conversation, LlmQuery};
use log::info;
use memory::MilvusQuery;
use runtime::Service;
use tts::TtsQuery;
use vision::{stringify, ImgCapQuery, OcrQuery, ShowUiQuery, VidCapQuery};

#[derive(Parser)]
#[command(name = "ump", author, version, about = "Talk to model services")]
struct Cli {
    /// Server address, overriding `<SERVICE>_URL`
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe a service's state
    State { service: Service },
    /// Ask the language model
    Chat {
        text: String,
        #[arg(long)]
        system: Option<String>,
        /// Print partial replies as they arrive
        #[arg(long)]
        stream: bool,
    },
    /// Synthesize speech to a file
    Speak {
        text: String,
        /// Reference recording for the voice
        #[arg(long, env = "TTS_REFER_WAV")]
        refer: String,
        #[arg(long, default_value = "zh")]
        lang: String,
        /// Output path without extension
        #[arg(long, default_value = "speech")]
        out: PathBuf,
        /// Save each streamed segment separately
        #[arg(long)]
        stream: bool,
    },
    /// Ask the language model and speak the reply
    Say {
        text: String,
        #[arg(long, env = "TTS_REFER_WAV")]
        refer: String,
        #[arg(long, default_value = "zh")]
        lang: String,
        #[arg(long, default_value = "reply")]
        out: PathBuf,
    },
    /// Transcribe a recording
    Transcribe {
        audio: String,
        /// Send the file through the streaming route
        #[arg(long)]
        stream: bool,
    },
    /// Caption an image
    Caption {
        image: String,
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Recognize text in an image
    Ocr { image: String },
    /// Caption a video
    Vidcap { video: String },
    /// Predict GUI actions for an instruction on a screenshot
    Showui {
        image: String,
        query: String,
        #[arg(long)]
        env: Option<String>,
    },
    /// Search a vector collection
    Search {
        collection: String,
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let url = cli.url.as_deref();

    match cli.command {
        Command::State { service } => {
            let state = runtime::probe(service, url).await?;
            println!("{}", serde_json::to_string(&state)?);
        }
        Command::Chat {
            text,
            system,
            stream,
        } => {
            let llm = runtime::llm(url)?;
            let history = system.map(Conversation::system).into_iter().collect();
            let query = LlmQuery::new(text).with_history(history);
            if stream {
                let (partials, last) = collect_stream(llm.stream_predict(&query).await?).await?;
                for partial in &partials {
                    info!("... {}", partial.response);
                }
                match last {
                    Some(reply) => println!("{}", reply.response),
                    None => bail!("the model sent no reply"),
                }
            } else {
                println!("{}", llm.predict(&query).await?.response);
            }
        }
        Command::Speak {
            text,
            refer,
            lang,
            out,
            stream,
        } => {
            let tts = runtime::tts(url)?;
            let query = TtsQuery::new(text, refer).language(lang);
            if stream {
                let mut segments = tts.stream_predict(&query).await?;
                while let Some(chunk) = segments.next().await {
                    let chunk = chunk?;
                    let stem = out.with_file_name(format!(
                        "{}-{}",
                        file_stem(&out),
                        chunk.seq
                    ));
                    println!("{}", chunk.payload.save(stem)?.display());
                }
            } else {
                println!("{}", tts.predict(&query).await?.save(&out)?.display());
            }
        }
        Command::Say {
            text,
            refer,
            lang,
            out,
        } => {
            // The LLM and TTS servers usually differ, so --url does not apply.
            let reply = runtime::llm(None)?.predict(&LlmQuery::new(text)).await?;
            println!("{}", reply.response);
            let query = TtsQuery::new(reply.response, refer).language(lang);
            let audio = runtime::tts(None)?.predict(&query).await?;
            println!("{}", audio.save(&out)?.display());
        }
        Command::Transcribe { audio, stream } => {
            let asr = runtime::asr(url)?;
            if stream {
                let data = tokio::fs::read(&audio)
                    .await
                    .with_context(|| format!("reading {audio}"))?;
                let mut query = AsrStreamQuery::new(&asr::AsrConfig::from_env(), data, true);
                if let Some(ext) = std::path::Path::new(&audio).extension() {
                    query.media_type = ext.to_string_lossy().into_owned();
                }
                let mut transcripts = asr.stream_predict(&query).await?;
                while let Some(chunk) = transcripts.next().await {
                    let chunk = chunk?;
                    if chunk.is_final {
                        println!("{}", chunk.payload.transcript);
                    } else {
                        info!("... {}", chunk.payload.transcript);
                    }
                }
            } else {
                println!("{}", asr.predict(&AsrQuery::new(audio)).await?.transcript);
            }
        }
        Command::Caption { image, prompt } => {
            let mut query = ImgCapQuery::new(image);
            if let Some(prompt) = prompt {
                query = query.prompt(prompt);
            }
            println!("{}", runtime::img_cap(url)?.predict(&query).await?.caption);
        }
        Command::Ocr { image } => {
            let prediction = runtime::ocr(url)?.predict(&OcrQuery::new(image)).await?;
            print!("{}", stringify(&prediction.region_results));
            info!("average confidence {:.3}", vision::avg_confidence(&prediction));
        }
        Command::Vidcap { video } => {
            let prediction = runtime::vid_cap(url)?
                .predict(&VidCapQuery::new(video))
                .await?;
            println!("{}", prediction.caption);
        }
        Command::Showui { image, query, env } => {
            let mut query = ShowUiQuery::new(image, query);
            query.env = env;
            let prediction = runtime::show_ui(url)?.predict(&query).await?;
            println!("{}", serde_json::to_string_pretty(&prediction.actions)?);
        }
        Command::Search {
            collection,
            query,
            limit,
        } => {
            let hits = runtime::milvus(url)?
                .search(&MilvusQuery::new(collection, query).limit(limit))
                .await?;
            for row in hits.result.iter().flatten() {
                println!(
                    "{:>4} {:.3} {}",
                    row.id,
                    row.distance,
                    row.field("text").unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "speech".into())
}
