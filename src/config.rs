//! 프로토콜 설정

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::packet::DATA_UNIT_OVERHEAD;
use crate::{
    Error, Result, DEFAULT_PAYLOAD_CAPACITY, DEFAULT_SENDER_ID, DEFAULT_SERVER_PORT,
    DEFAULT_UNITS_PER_TRANSFER, END_MARKER, START_MARKER,
};

/// SWP 프로토콜 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 서버 수신 포트
    pub server_port: u16,

    /// 전송당 데이터 유닛 수
    pub units_per_transfer: usize,

    /// 유닛당 최대 전송 시도 횟수 (최초 전송 포함)
    pub max_attempts: u32,

    /// 송신자 ACK 대기 타임아웃 (밀리초)
    pub ack_timeout_ms: u64,

    /// 수신자 비활성 타임아웃 (밀리초)
    /// 이 시간 동안 유닛이 없으면 세션 리셋
    pub inactivity_timeout_ms: u64,

    /// 고정 페이로드 용량 (바이트)
    pub payload_capacity: usize,

    /// 시작 마커
    pub start_marker: u16,

    /// 종료 마커
    pub end_marker: u16,

    /// 송신자 ID
    pub sender_id: u8,

    /// 수신 버퍼 크기
    pub recv_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            units_per_transfer: DEFAULT_UNITS_PER_TRANSFER,
            max_attempts: 3,
            ack_timeout_ms: 3000,          // 3초
            inactivity_timeout_ms: 2500,   // 2.5초
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
            start_marker: START_MARKER,
            end_marker: END_MARKER,
            sender_id: DEFAULT_SENDER_ID,
            recv_buffer_size: 2048,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 루프백 테스트용 설정 (짧은 타임아웃)
    pub fn fast_local() -> Self {
        Self {
            ack_timeout_ms: 200,
            inactivity_timeout_ms: 400,
            ..Self::default()
        }
    }

    /// 이전 서버 버전의 2초 비활성 타임아웃
    pub fn legacy_inactivity() -> Self {
        Self {
            inactivity_timeout_ms: 2000,
            ..Self::default()
        }
    }

    /// TOML 문자열에서 로드 (누락 필드는 기본값)
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.units_per_transfer == 0 {
            return Err(Error::InvalidConfig("units_per_transfer must be > 0".into()));
        }
        // 시퀀스 번호는 8비트
        if self.units_per_transfer > u8::MAX as usize + 1 {
            return Err(Error::InvalidConfig(format!(
                "units_per_transfer {} exceeds 8-bit sequence space",
                self.units_per_transfer
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be > 0".into()));
        }
        if self.ack_timeout_ms == 0 || self.inactivity_timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeouts must be > 0".into()));
        }
        if self.payload_capacity == 0 || self.payload_capacity > u8::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "payload_capacity {} must be in 1..=255",
                self.payload_capacity
            )));
        }
        if self.recv_buffer_size < self.data_unit_len() {
            return Err(Error::InvalidConfig(format!(
                "recv_buffer_size {} smaller than data unit ({} bytes)",
                self.recv_buffer_size,
                self.data_unit_len()
            )));
        }
        Ok(())
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    /// 데이터 유닛의 와이어 크기
    pub fn data_unit_len(&self) -> usize {
        DATA_UNIT_OVERHEAD + self.payload_capacity
    }
}
