//! 에러 타입 정의

use thiserror::Error;

use crate::packet::RejectReason;

/// SWP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    /// 전송 계층 (소켓 송수신) 실패
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("잘못된 패킷 크기: expected {expected} bytes, got {got}")]
    MalformedPacket { expected: usize, got: usize },

    #[error("재시도 초과: position={position}, sequence={sequence}, attempts={attempts}")]
    RetriesExhausted {
        position: usize,
        sequence: u8,
        attempts: u32,
    },

    /// 수신자가 명시적으로 거부
    ///
    /// `position`은 전송 내 유닛 위치, `sequence`는 응답에 에코된 시퀀스 번호
    #[error("유닛 거부: position={position}, sequence={sequence}, reason={reason}")]
    Rejected {
        position: usize,
        sequence: u8,
        reason: RejectReason,
    },

    #[error("프로토콜 위반: outcome={outcome:#06X}, reason={reason:#06X}")]
    ProtocolViolation { outcome: u16, reason: u16 },

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),

    #[error("설정 파싱 에러: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("유효하지 않은 테스트 케이스: {0} (0~4)")]
    InvalidTestCase(u8),

    #[error("전송 유닛 부족: {units}개 (최소 {required}개 필요)")]
    TransferTooShort { units: usize, required: usize },
}

impl Error {
    /// 현재 전송을 중단시키는 에러인지 여부
    ///
    /// 송신자 측에서는 MalformedPacket도 전송 에러와 동일하게 취급
    pub fn is_fatal_to_transfer(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::MalformedPacket { .. }
                | Error::RetriesExhausted { .. }
                | Error::Rejected { .. }
                | Error::ProtocolViolation { .. }
        )
    }

    /// 거부 사유 (Rejected일 때만)
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Error::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
