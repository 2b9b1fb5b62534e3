//! 전송 통계

use std::time::{Duration, Instant};

use crate::packet::RejectReason;

/// 송신 측 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 전송 대상 유닛 수
    pub total_units: usize,

    /// ACK 받은 유닛 수
    pub acknowledged_units: usize,

    /// 총 데이터그램 전송 수 (재전송 포함)
    pub transmissions: u64,

    /// 재전송 수
    pub retransmissions: u64,

    /// ACK 대기 타임아웃 횟수
    pub timeouts: u64,

    /// 무시한 응답 수 (다른 주소/시퀀스)
    pub stray_responses: u64,
}

impl TransferStats {
    pub fn new(total_units: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total_units,
            acknowledged_units: 0,
            transmissions: 0,
            retransmissions: 0,
            timeouts: 0,
            stray_responses: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_complete(&self) -> bool {
        self.acknowledged_units == self.total_units
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Units: {}/{} | Transmissions: {} | Retransmissions: {} | Timeouts: {}",
            self.elapsed().as_secs_f64(),
            self.acknowledged_units,
            self.total_units,
            self.transmissions,
            self.retransmissions,
            self.timeouts,
        )
    }
}

/// 수신 측 통계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// 디코딩에 성공한 유닛 수
    pub received: u64,

    pub acknowledged: u64,

    /// 사유별 거부 수 (RejectReason::ALL 순서)
    pub rejected: [u64; 4],

    /// 크기가 맞지 않거나 읽기 실패한 데이터그램
    pub malformed: u64,

    pub session_resets: u64,

    /// 응답 전송 실패
    pub send_failures: u64,
}

impl ReceiverStats {
    pub fn record_reject(&mut self, reason: RejectReason) {
        self.rejected[reason_index(reason)] += 1;
    }

    pub fn rejected_for(&self, reason: RejectReason) -> u64 {
        self.rejected[reason_index(reason)]
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected.iter().sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "Received: {} | ACK: {} | REJECT: {} (seq {}, len {}, end {}, dup {}) | Malformed: {} | Resets: {}",
            self.received,
            self.acknowledged,
            self.total_rejected(),
            self.rejected[0],
            self.rejected[1],
            self.rejected[2],
            self.rejected[3],
            self.malformed,
            self.session_resets,
        )
    }
}

fn reason_index(reason: RejectReason) -> usize {
    match reason {
        RejectReason::OutOfSequence => 0,
        RejectReason::LengthMismatch => 1,
        RejectReason::BadEndMarker => 2,
        RejectReason::DuplicatePacket => 3,
    }
}
