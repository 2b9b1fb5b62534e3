//! SWP 클라이언트 (송신자) - Stop-and-Wait Protocol
//!
//! 고정 개수의 데이터 유닛을 하나씩 전송
//! - ACK 타임아웃 시 재전송 (유닛당 최대 시도 횟수)
//! - REJECT 또는 재시도 초과 시 즉시 중단, 종료 코드 1
//!
//! 사용법:
//!   cargo run --release --bin swp-client -- <TEST_CASE> [PORT] [OPTIONS]
//!
//! 테스트 케이스:
//!   0  정상 전송
//!   1  순서 뒤바뀐 유닛 (OutOfSequence)
//!   2  길이 불일치 (LengthMismatch)
//!   3  잘못된 종료 마커 (BadEndMarker)
//!   4  중복 유닛 (DuplicatePacket)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use swp::fault::{self, TestCase};
use swp::{build_transfer, Config, Error, Sender};

#[derive(Parser, Debug)]
#[command(author, version, about = "SWP Client - Stop-and-Wait Protocol sender")]
struct Args {
    /// 테스트 케이스 (0~4)
    test_case: u8,

    /// 서버 포트 (기본: 설정값 23456)
    port: Option<u16>,

    /// 서버 IP
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// TOML 설정 파일
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 유닛당 최대 시도 횟수
    #[arg(long)]
    max_attempts: Option<u32>,

    /// ACK 대기 타임아웃 (밀리초)
    #[arg(long)]
    ack_timeout_ms: Option<u64>,
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
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(ms) = self.ack_timeout_ms {
            config.ack_timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run(args: &Args) -> swp::Result<()> {
    let config = args.build_config()?;
    let case = TestCase::try_from(args.test_case)?;
    info!("Client test case {}: {}", args.test_case, case.description());

    let units = fault::inject(build_transfer(&config), case)?;

    let server_addr = SocketAddr::new(args.host, config.server_port);
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], 0));
    let sender = Sender::bind(config, bind_addr, server_addr).await?;

    let stats = sender.run(&units).await?;
    info!("Client received all ACKs with no errors: {}", stats.summary());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match &e {
                Error::Rejected { position, sequence, reason } => {
                    error!("REJECT {} on packet {} (server echoed seq {})", reason, position, sequence)
                }
                Error::RetriesExhausted { position, attempts, .. } => {
                    error!("Time-out: packet {} sent {} times without response", position, attempts)
                }
                other => error!("Transfer failed: {}", other),
            }
            ExitCode::FAILURE
        }
    }
}
