//! SWP 서버 (수신자) - Stop-and-Wait Protocol
//!
//! 데이터 유닛을 검증하고 ACK/REJECT 응답
//! - 한 번에 하나의 송신자 세션
//! - 송신자가 조용해지면 세션 리셋 후 다음 송신자 대기
//! - 종료 경로 없음 (Ctrl-C로 종료)
//!
//! 사용법:
//!   cargo run --release --bin swp-server -- [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin swp-server -- --port 23456 --inactivity-timeout-ms 2000
//!   cargo run --release --bin swp-server -- --legacy-inactivity

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swp::{Config, Receiver};

#[derive(Parser, Debug)]
#[command(author, version, about = "SWP Server - Stop-and-Wait Protocol receiver")]
struct Args {
    /// 수신 포트 (기본: 설정값 23456)
    #[arg(short, long)]
    port: Option<u16>,

    /// 바인드 IP
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// TOML 설정 파일
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 비활성 타임아웃 (밀리초)
    #[arg(long)]
    inactivity_timeout_ms: Option<u64>,

    /// 이전 서버의 2초 비활성 타임아웃 사용
    #[arg(long, conflicts_with = "inactivity_timeout_ms")]
    legacy_inactivity: bool,
}

impl Args {
    fn build_config(&self) -> swp::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(port) = self.port {
            config.server_port = port;
        }
        if let Some(ms) = self.inactivity_timeout_ms {
            config.inactivity_timeout_ms = ms;
        } else if self.legacy_inactivity {
            config.inactivity_timeout_ms = Config::legacy_inactivity().inactivity_timeout_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.build_config()?;

    info!("SWP Server starting...");
    info!("Payload capacity: {} bytes", config.payload_capacity);
    info!("Inactivity timeout: {} ms", config.inactivity_timeout_ms);

    let bind_addr = SocketAddr::new(args.bind, config.server_port);
    let mut receiver = Receiver::bind(config, bind_addr).await?;

    receiver.run().await;
    Ok(())
}
