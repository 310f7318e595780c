use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::dto::{MeetingReportResponse, ReportStatus};

struct Entry {
    /// 가장 최근에 접수된 요청의 순번
    sequence: u64,
    record: MeetingReportResponse,
}

/// 모임별 레포트 저장소 (인메모리)
///
/// 모임 하나당 레코드 하나를 유지합니다. 같은 모임에 요청이 겹치면 가장 나중에 접수된
/// 요청의 결과만 기록하고, 먼저 접수된 작업이 늦게 끝나도 덮어쓰지 않습니다.
/// 이전에 완료된 요약은 새 작업이 성공할 때까지 남겨 둡니다.
#[derive(Clone, Default)]
pub struct ReportStore {
    records: Arc<RwLock<HashMap<i64, Entry>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 요청을 PENDING 으로 표시하고 그 요청의 순번을 돌려줍니다.
    pub async fn mark_pending(&self, meeting_id: i64) -> u64 {
        let mut records = self.records.write().await;
        let now = Utc::now();

        let entry = records.entry(meeting_id).or_insert_with(|| Entry {
            sequence: 0,
            record: MeetingReportResponse {
                meeting_id,
                status: ReportStatus::Pending,
                summary_text: None,
                attempts: 0,
                error: None,
                updated_at: now,
            },
        });
        entry.sequence += 1;
        entry.record.status = ReportStatus::Pending;
        entry.record.attempts = 0;
        entry.record.error = None;
        entry.record.updated_at = now;

        tracing::debug!(meeting_id, sequence = entry.sequence, "Report marked pending");
        entry.sequence
    }

    /// 요약을 기록합니다. 더 최근 요청이 있으면 무시하고 `false` 를 돌려줍니다.
    pub async fn complete(
        &self,
        meeting_id: i64,
        sequence: u64,
        summary_text: String,
        attempts: u32,
    ) -> bool {
        self.settle(meeting_id, sequence, |record| {
            record.status = ReportStatus::Completed;
            record.summary_text = Some(summary_text);
            record.attempts = attempts;
            record.error = None;
        })
        .await
    }

    /// 실패를 기록합니다. 이전 요약은 지우지 않습니다.
    pub async fn fail(&self, meeting_id: i64, sequence: u64, attempts: u32, error: String) -> bool {
        self.settle(meeting_id, sequence, |record| {
            record.status = ReportStatus::Failed;
            record.attempts = attempts;
            record.error = Some(error);
        })
        .await
    }

    pub async fn get(&self, meeting_id: i64) -> Option<MeetingReportResponse> {
        self.records
            .read()
            .await
            .get(&meeting_id)
            .map(|entry| entry.record.clone())
    }

    async fn settle<F>(&self, meeting_id: i64, sequence: u64, apply: F) -> bool
    where
        F: FnOnce(&mut MeetingReportResponse),
    {
        let mut records = self.records.write().await;
        let Some(entry) = records.get_mut(&meeting_id) else {
            tracing::warn!(meeting_id, sequence, "Result for unknown report ignored");
            return false;
        };

        if entry.sequence != sequence {
            tracing::info!(
                meeting_id,
                sequence,
                latest = entry.sequence,
                "Stale report result ignored"
            );
            return false;
        }

        apply(&mut entry.record);
        entry.record.updated_at = Utc::now();
        tracing::debug!(meeting_id, sequence, status = ?entry.record.status, "Report record updated");
        true
    }
}
