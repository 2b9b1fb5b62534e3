//! 와이어 패킷 정의
//!
//! - DataUnit: 송신자 → 수신자, 시퀀스 번호가 붙은 고정 크기 조각
//! - ResponseUnit: 수신자 → 송신자, ACK 또는 사유 코드가 붙은 REJECT
//!
//! 모든 다중 바이트 필드는 네트워크 바이트 순서 (big-endian).
//! 이 모듈은 필드 추출만 하고 의미 검증은 하지 않음.
//!
//! ```text
//! DataUnit:     start(2) | sender_id(1) | kind(2) | seq(1) | length(1) | payload(N) | end(2)
//! ResponseUnit: start(2) | sender_id(1) | outcome(2) | reason(2) | seq(1) | end(2)
//! ```

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Config, Error, Result};

/// 데이터 유닛에서 페이로드를 제외한 바이트 수
pub const DATA_UNIT_OVERHEAD: usize = 9;

/// 응답 유닛 크기 (고정)
pub const RESPONSE_UNIT_LEN: usize = 10;

/// ACK 응답의 사유 필드 값
const NO_REASON: u16 = 0x0000;

/// 패킷 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Data,
    Ack,
    Reject,
}

impl PacketKind {
    pub const fn code(self) -> u16 {
        match self {
            PacketKind::Data => 0xFFF1,
            PacketKind::Ack => 0xFFF2,
            PacketKind::Reject => 0xFFF3,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0xFFF1 => Some(PacketKind::Data),
            0xFFF2 => Some(PacketKind::Ack),
            0xFFF3 => Some(PacketKind::Reject),
            _ => None,
        }
    }
}

/// 거부 사유 (검증 우선순위 순)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// 기대보다 앞선 시퀀스 번호
    OutOfSequence,
    /// 선언 길이 ≠ 페이로드 용량
    LengthMismatch,
    /// 종료 마커 불일치
    BadEndMarker,
    /// 이미 수락된 시퀀스 번호
    DuplicatePacket,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        RejectReason::OutOfSequence,
        RejectReason::LengthMismatch,
        RejectReason::BadEndMarker,
        RejectReason::DuplicatePacket,
    ];

    pub const fn code(self) -> u16 {
        match self {
            RejectReason::OutOfSequence => 0xFFF4,
            RejectReason::LengthMismatch => 0xFFF5,
            RejectReason::BadEndMarker => 0xFFF6,
            RejectReason::DuplicatePacket => 0xFFF7,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectReason::OutOfSequence => "OutOfSequence",
            RejectReason::LengthMismatch => "LengthMismatch",
            RejectReason::BadEndMarker => "BadEndMarker",
            RejectReason::DuplicatePacket => "DuplicatePacket",
        };
        f.write_str(name)
    }
}

/// 응답 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acknowledged,
    Rejected(RejectReason),
}

impl Outcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Outcome::Acknowledged)
    }

    /// (outcome 코드, reason 코드)
    fn codes(self) -> (u16, u16) {
        match self {
            Outcome::Acknowledged => (PacketKind::Ack.code(), NO_REASON),
            Outcome::Rejected(reason) => (PacketKind::Reject.code(), reason.code()),
        }
    }

    fn from_codes(outcome: u16, reason: u16) -> Result<Self> {
        match PacketKind::from_code(outcome) {
            Some(PacketKind::Ack) => Ok(Outcome::Acknowledged),
            Some(PacketKind::Reject) => RejectReason::from_code(reason)
                .map(Outcome::Rejected)
                .ok_or(Error::ProtocolViolation { outcome, reason }),
            _ => Err(Error::ProtocolViolation { outcome, reason }),
        }
    }
}

/// 데이터 유닛 (송신 패킷 단위)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    pub start_marker: u16,
    pub sender_id: u8,
    /// 와이어 형태 맞춤용, 분기에는 사용하지 않음
    pub kind_marker: u16,
    pub sequence_number: u8,
    /// 송신자가 주장하는 페이로드 길이
    pub declared_length: u8,
    /// 고정 용량 페이로드
    pub payload: Bytes,
    pub end_marker: u16,
}

impl DataUnit {
    /// 새 데이터 유닛 생성
    ///
    /// `content`는 페이로드 용량에 맞게 잘리거나 0으로 채워짐
    pub fn new(config: &Config, sequence_number: u8, content: &[u8]) -> Self {
        let capacity = config.payload_capacity;
        let mut payload = BytesMut::zeroed(capacity);
        let n = content.len().min(capacity);
        payload[..n].copy_from_slice(&content[..n]);

        Self {
            start_marker: config.start_marker,
            sender_id: config.sender_id,
            kind_marker: PacketKind::Data.code(),
            sequence_number,
            declared_length: capacity as u8,
            payload: payload.freeze(),
            end_marker: config.end_marker,
        }
    }

    /// 와이어 크기
    pub fn encoded_len(&self) -> usize {
        DATA_UNIT_OVERHEAD + self.payload.len()
    }

    /// 바이트로 직렬화
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16(self.start_marker);
        buf.put_u8(self.sender_id);
        buf.put_u16(self.kind_marker);
        buf.put_u8(self.sequence_number);
        buf.put_u8(self.declared_length);
        buf.put_slice(&self.payload);
        buf.put_u16(self.end_marker);
        buf.to_vec()
    }

    /// 바이트에서 역직렬화
    ///
    /// 크기가 `DATA_UNIT_OVERHEAD + payload_capacity`와 다르면 MalformedPacket
    pub fn decode(bytes: &[u8], payload_capacity: usize) -> Result<Self> {
        let expected = DATA_UNIT_OVERHEAD + payload_capacity;
        if bytes.len() != expected {
            return Err(Error::MalformedPacket {
                expected,
                got: bytes.len(),
            });
        }

        let mut buf = bytes;
        let start_marker = buf.get_u16();
        let sender_id = buf.get_u8();
        let kind_marker = buf.get_u16();
        let sequence_number = buf.get_u8();
        let declared_length = buf.get_u8();
        let payload = buf.copy_to_bytes(payload_capacity);
        let end_marker = buf.get_u16();

        Ok(Self {
            start_marker,
            sender_id,
            kind_marker,
            sequence_number,
            declared_length,
            payload,
            end_marker,
        })
    }

    /// 페이로드에서 NUL 앞까지의 텍스트 (로그용)
    pub fn payload_text(&self) -> String {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.payload.len());
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }
}

/// 응답 유닛
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseUnit {
    pub start_marker: u16,
    pub sender_id: u8,
    pub outcome: Outcome,
    pub sequence_number: u8,
    pub end_marker: u16,
}

impl ResponseUnit {
    /// 트리거 유닛의 sender_id / 시퀀스 번호를 에코하는 응답 생성
    pub fn for_unit(unit: &DataUnit, outcome: Outcome, config: &Config) -> Self {
        Self {
            start_marker: config.start_marker,
            sender_id: unit.sender_id,
            outcome,
            sequence_number: unit.sequence_number,
            end_marker: config.end_marker,
        }
    }

    pub fn encode(&self) -> [u8; RESPONSE_UNIT_LEN] {
        let (outcome, reason) = self.outcome.codes();
        let mut out = [0u8; RESPONSE_UNIT_LEN];
        let mut buf = &mut out[..];
        buf.put_u16(self.start_marker);
        buf.put_u8(self.sender_id);
        buf.put_u16(outcome);
        buf.put_u16(reason);
        buf.put_u8(self.sequence_number);
        buf.put_u16(self.end_marker);
        out
    }

    /// 바이트에서 역직렬화
    ///
    /// ACK/REJECT 이외의 결과 코드는 ProtocolViolation
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RESPONSE_UNIT_LEN {
            return Err(Error::MalformedPacket {
                expected: RESPONSE_UNIT_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = bytes;
        let start_marker = buf.get_u16();
        let sender_id = buf.get_u8();
        let outcome_code = buf.get_u16();
        let reason_code = buf.get_u16();
        let sequence_number = buf.get_u8();
        let end_marker = buf.get_u16();

        Ok(Self {
            start_marker,
            sender_id,
            outcome: Outcome::from_codes(outcome_code, reason_code)?,
            sequence_number,
            end_marker,
        })
    }
}
