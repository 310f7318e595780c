use std::sync::Arc;

use validator::Validate;

use super::dto::{GeneratedReport, MeetingSummaryInput};
use super::prompt::PromptAssembler;
use super::retry::{with_bounded_retry, AttemptCounter, RetryPolicy};
use super::template::PromptTemplate;
use crate::domain::ai::AiClient;
use crate::error::AppError;

/// 모임 요약 레포트 생성기
///
/// 프롬프트를 한 번 조립한 뒤 재시도 정책 안에서 텍스트 생성 클라이언트를 호출합니다.
/// 공유 상태는 읽기 전용 템플릿과 클라이언트뿐이라 여러 요청에서 동시에 사용해도 됩니다.
#[derive(Clone)]
pub struct ReportGenerator {
    client: AiClient,
    assembler: PromptAssembler,
    policy: RetryPolicy,
}

impl ReportGenerator {
    pub fn new(client: AiClient, template: Arc<PromptTemplate>, policy: RetryPolicy) -> Self {
        Self {
            client,
            assembler: PromptAssembler::new(template),
            policy,
        }
    }

    /// 레포트를 생성합니다.
    ///
    /// 입력 검증 실패와 영구적 오류는 재시도하지 않습니다.
    pub async fn generate(&self, input: &MeetingSummaryInput) -> Result<GeneratedReport, AppError> {
        self.generate_counted(input, &AttemptCounter::new()).await
    }

    /// `generate` 와 같지만 provider 호출 횟수를 `attempts` 에 남깁니다.
    ///
    /// 실패하거나 취소된 뒤에도 호출자가 실제 시도 횟수를 읽을 수 있습니다.
    pub async fn generate_counted(
        &self,
        input: &MeetingSummaryInput,
        attempts: &AttemptCounter,
    ) -> Result<GeneratedReport, AppError> {
        input.validate()?;

        let prompt = self.assembler.assemble(input);
        tracing::info!(
            title = %input.title,
            prompt_length = prompt.len(),
            participants = input.participant_selections.len(),
            max_attempts = self.policy.max_attempts,
            "Generating meeting report"
        );

        let client = &self.client;
        let prompt = prompt.as_str();
        let result = with_bounded_retry(&self.policy, attempts, move |attempt| async move {
            tracing::debug!(attempt, "Calling text generation provider");
            let text = client.submit(prompt).await?;
            if text.trim().is_empty() {
                return Err(AppError::TransientGenerationFailure(
                    "provider returned an empty completion".to_string(),
                ));
            }
            Ok(text)
        })
        .await;

        match result {
            Ok(text) => {
                metrics::counter!("report_generation_total", "outcome" => "success").increment(1);
                tracing::info!(
                    attempts = attempts.get(),
                    report_length = text.len(),
                    "Meeting report generated"
                );
                Ok(GeneratedReport::new(text, attempts.get()))
            }
            Err(error) => {
                let outcome = match &error {
                    AppError::GenerationFailed { .. } => "exhausted",
                    _ => "rejected",
                };
                metrics::counter!("report_generation_total", "outcome" => outcome).increment(1);
                Err(error)
            }
        }
    }
}
