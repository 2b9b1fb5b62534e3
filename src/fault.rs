//! 오류 주입 (수신자 검증기 테스트용)
//!
//! 정상 전송 유닛 목록을 변형하여 네 가지 거부 사유를 각각 유발.
//! 대상은 끝에서 두 번째 유닛 (기본 5개 전송이면 3번 위치).

use rand::Rng;

use crate::packet::{DataUnit, RejectReason};
use crate::{Error, Result};

/// 잘못된 종료 마커 값
pub const CORRUPT_END_MARKER: u16 = 0x1234;

/// 길이 변형 최대 폭
const MAX_LENGTH_SKEW: i16 = 5;

/// 테스트 케이스 선택자 (0~4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestCase {
    /// 0: 변형 없음
    Normal,
    /// 1: 인접 유닛 순서 교환
    OutOfOrder,
    /// 2: 선언 길이 변형
    LengthMismatch,
    /// 3: 종료 마커 손상
    BadEndMarker,
    /// 4: 앞 유닛을 다음 슬롯에 복제
    Duplicate,
}

impl TryFrom<u8> for TestCase {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TestCase::Normal),
            1 => Ok(TestCase::OutOfOrder),
            2 => Ok(TestCase::LengthMismatch),
            3 => Ok(TestCase::BadEndMarker),
            4 => Ok(TestCase::Duplicate),
            other => Err(Error::InvalidTestCase(other)),
        }
    }
}

impl TestCase {
    /// 수신자가 보고해야 하는 거부 사유
    pub fn expected_reject(self) -> Option<RejectReason> {
        match self {
            TestCase::Normal => None,
            TestCase::OutOfOrder => Some(RejectReason::OutOfSequence),
            TestCase::LengthMismatch => Some(RejectReason::LengthMismatch),
            TestCase::BadEndMarker => Some(RejectReason::BadEndMarker),
            TestCase::Duplicate => Some(RejectReason::DuplicatePacket),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TestCase::Normal => "Sending data normally, not testing error handling",
            TestCase::OutOfOrder => "Out-of-order packets",
            TestCase::LengthMismatch => "Mismatch in length",
            TestCase::BadEndMarker => "Incorrect end-of-packet marker",
            TestCase::Duplicate => "Duplicate packets",
        }
    }
}

/// 테스트 케이스에 맞게 유닛 목록 변형
pub fn inject(units: Vec<DataUnit>, case: TestCase) -> Result<Vec<DataUnit>> {
    inject_with_rng(units, case, &mut rand::thread_rng())
}

/// RNG를 지정하는 버전 (길이 변형에만 사용)
pub fn inject_with_rng<R: Rng>(
    mut units: Vec<DataUnit>,
    case: TestCase,
    rng: &mut R,
) -> Result<Vec<DataUnit>> {
    if case == TestCase::Normal {
        return Ok(units);
    }
    if units.len() < 2 {
        return Err(Error::TransferTooShort {
            units: units.len(),
            required: 2,
        });
    }

    let target = units.len() - 2;
    match case {
        TestCase::Normal => {}
        TestCase::OutOfOrder => units.swap(target, target + 1),
        TestCase::LengthMismatch => {
            let skew = loop {
                let skew = rng.gen_range(-MAX_LENGTH_SKEW..=MAX_LENGTH_SKEW);
                if skew != 0 {
                    break skew;
                }
            };
            let unit = &mut units[target];
            unit.declared_length = (unit.declared_length as i16 + skew) as u8;
        }
        TestCase::BadEndMarker => units[target].end_marker = CORRUPT_END_MARKER,
        TestCase::Duplicate => units[target + 1] = units[target].clone(),
    }

    Ok(units)
}
