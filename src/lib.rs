//! # SWP (Stop-and-Wait Protocol)
//!
//! UDP 기반 ACK/REJECT 신뢰 전송 프로토콜
//!
//! ## 핵심 특징
//! - **Stop-and-Wait**: 한 번에 하나의 데이터 유닛만 전송 중
//! - **4단계 검증**: 순서 → 길이 → 종료 마커 → 중복 순으로 판정
//! - **타임아웃 재전송**: 유닛당 최대 시도 횟수 제한
//! - **REJECT 즉시 중단**: 거부 응답은 재시도하지 않음
//! - **세션 리셋**: 송신자가 조용해지면 수신 세션 초기화

pub mod config;
pub mod error;
pub mod fault;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use fault::TestCase;
pub use packet::{DataUnit, Outcome, PacketKind, RejectReason, ResponseUnit};
pub use receiver::{handle_incoming, Receiver, ReceiverEvent, Session};
pub use sender::{build_transfer, Sender};
pub use stats::{ReceiverStats, TransferStats};
pub use transport::Endpoint;

/// 패킷 시작 마커
pub const START_MARKER: u16 = 0xFFFF;

/// 패킷 종료 마커
pub const END_MARKER: u16 = 0xFFFF;

/// 기본 송신자 ID
pub const DEFAULT_SENDER_ID: u8 = 0x42;

/// 기본 서버 포트
pub const DEFAULT_SERVER_PORT: u16 = 23456;

/// 기본 페이로드 용량 (바이트, 길이 필드가 8비트이므로 최대 255)
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 0xFF;

/// 전송당 기본 유닛 수
pub const DEFAULT_UNITS_PER_TRANSFER: usize = 5;
