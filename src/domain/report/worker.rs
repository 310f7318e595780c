use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use super::dto::MeetingSummaryInput;
use super::retry::AttemptCounter;
use super::service::ReportGenerator;
use super::store::ReportStore;
use crate::error::AppError;
use crate::shutdown::Shutdown;

/// 비동기 레포트 생성 작업
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub meeting_id: i64,
    /// 저장소가 발급한 요청 순번, 결과는 이 순번이 최신일 때만 기록된다
    pub sequence: u64,
    pub input: MeetingSummaryInput,
}

/// 레포트 작업 큐
///
/// 용량이 정해진 채널이라 가득 차면 즉시 거절합니다.
#[derive(Clone)]
pub struct ReportQueue {
    tx: mpsc::Sender<ReportJob>,
    store: ReportStore,
}

impl ReportQueue {
    /// 큐를 만들고 워커를 띄웁니다.
    pub fn start(
        generator: ReportGenerator,
        store: ReportStore,
        worker_count: usize,
        capacity: usize,
        shutdown: &Shutdown,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (1..=worker_count.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&rx),
                    generator.clone(),
                    store.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();

        tracing::info!(worker_count, capacity, "Report workers started");
        (Self { tx, store }, handles)
    }

    /// 작업을 큐에 넣고 레코드를 PENDING 으로 표시합니다.
    ///
    /// 같은 모임에 대한 이전 작업이 아직 돌고 있어도 이번 요청의 결과가 최종 레코드가 됩니다.
    pub async fn enqueue(
        &self,
        meeting_id: i64,
        input: MeetingSummaryInput,
    ) -> Result<u64, AppError> {
        let permit = self.tx.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                metrics::counter!("report_queue_rejected_total").increment(1);
                AppError::QueueFull(format!(
                    "report queue is full, meeting {} rejected",
                    meeting_id
                ))
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::internal_error("report workers are not running")
            }
        })?;

        // 워커가 결과를 쓰기 전에 PENDING 이 먼저 기록되도록 permit 확보 후 표시
        let sequence = self.store.mark_pending(meeting_id).await;
        tracing::info!(meeting_id, sequence, "Report job enqueued");
        permit.send(ReportJob {
            meeting_id,
            sequence,
            input,
        });
        Ok(sequence)
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<ReportJob>>>,
    generator: ReportGenerator,
    store: ReportStore,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "Report worker running");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                job = rx.recv() => job,
                _ = shutdown.changed() => None,
            }
        };
        let Some(job) = job else { break };

        let attempts = AttemptCounter::new();
        tokio::select! {
            _ = process_job(&generator, &store, &job, &attempts) => {}
            _ = shutdown.changed() => {
                let attempts = attempts.get();
                tracing::warn!(
                    worker_id,
                    meeting_id = job.meeting_id,
                    attempts,
                    "Report job cancelled by shutdown"
                );
                let reason = "cancelled by shutdown".to_string();
                store.fail(job.meeting_id, job.sequence, attempts, reason).await;
                break;
            }
        }
    }

    tracing::debug!(worker_id, "Report worker stopped");
}

async fn process_job(
    generator: &ReportGenerator,
    store: &ReportStore,
    job: &ReportJob,
    attempts: &AttemptCounter,
) {
    let meeting_id = job.meeting_id;
    match generator.generate_counted(&job.input, attempts).await {
        Ok(report) => {
            tracing::info!(meeting_id, attempts = report.attempts, "Report job completed");
            store
                .complete(meeting_id, job.sequence, report.content, report.attempts)
                .await;
        }
        Err(error) => {
            // 검증 실패는 provider 를 부르지 않으므로 0
            let attempts = attempts.get();
            tracing::error!(meeting_id, attempts, error = %error, "Report job failed");
            store
                .fail(meeting_id, job.sequence, attempts, error.client_message())
                .await;
        }
    }
}
