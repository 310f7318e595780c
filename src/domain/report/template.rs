//! 프롬프트 템플릿
//!
//! 템플릿은 일반 텍스트와 `{{name}}` 형태의 자리표시자로 구성됩니다.
//! 프로세스 시작 시 한 번 파싱되고 이후에는 읽기 전용으로 공유됩니다.
//!
//! ## 자리표시자
//! - 필수 (정확히 한 번, 아래 순서대로): `title`, `description`, `host`,
//!   `voted_participants`, `participant_selections`
//! - 선택 (최대 한 번): `option_statistics`

use std::fmt;
use std::path::Path;

use crate::error::AppError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// 템플릿 자리표시자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Host,
    VotedParticipants,
    OptionStatistics,
    ParticipantSelections,
}

impl Field {
    /// 반드시 이 순서대로 등장해야 하는 자리표시자
    pub const REQUIRED: [Field; 5] = [
        Field::Title,
        Field::Description,
        Field::Host,
        Field::VotedParticipants,
        Field::ParticipantSelections,
    ];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "description" => Some(Field::Description),
            "host" => Some(Field::Host),
            "voted_participants" => Some(Field::VotedParticipants),
            "option_statistics" => Some(Field::OptionStatistics),
            "participant_selections" => Some(Field::ParticipantSelections),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Host => "host",
            Field::VotedParticipants => "voted_participants",
            Field::OptionStatistics => "option_statistics",
            Field::ParticipantSelections => "participant_selections",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// 파싱된 프롬프트 템플릿
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// 파일에서 템플릿을 읽어 파싱합니다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            AppError::TemplateLoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let template = Self::parse(&source)?;
        tracing::info!(
            path = %path.display(),
            length = source.len(),
            "Prompt template loaded"
        );
        Ok(template)
    }

    /// 바이너리에 포함된 기본 템플릿
    pub fn embedded() -> Result<Self, AppError> {
        Self::parse(include_str!("../../../prompts/meeting-summary-kr.txt"))
    }

    /// 템플릿 문자열을 파싱하고 자리표시자 규칙을 검증합니다.
    pub fn parse(source: &str) -> Result<Self, AppError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                AppError::TemplateLoadFailed(format!(
                    "unterminated placeholder at byte {}",
                    source.len() - rest.len() + start
                ))
            })?;

            let name = after_open[..end].trim();
            let field = Field::from_name(name).ok_or_else(|| {
                AppError::TemplateLoadFailed(format!("unknown placeholder {{{{{}}}}}", name))
            })?;
            segments.push(Segment::Field(field));

            rest = &after_open[end + CLOSE.len()..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        let template = Self { segments };
        template.validate()?;
        Ok(template)
    }

    fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(field) => Some(*field),
            Segment::Literal(_) => None,
        })
    }

    fn validate(&self) -> Result<(), AppError> {
        let required: Vec<Field> = self
            .fields()
            .filter(|field| *field != Field::OptionStatistics)
            .collect();

        if required != Field::REQUIRED {
            let expected = Field::REQUIRED
                .iter()
                .map(Field::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let found = required
                .iter()
                .map(Field::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AppError::TemplateLoadFailed(format!(
                "placeholders must appear exactly once in order [{}], found [{}]",
                expected, found
            )));
        }

        if self
            .fields()
            .filter(|field| *field == Field::OptionStatistics)
            .count()
            > 1
        {
            return Err(AppError::TemplateLoadFailed(format!(
                "{} may appear at most once",
                Field::OptionStatistics
            )));
        }

        Ok(())
    }

    /// 템플릿이 해당 자리표시자를 포함하는지 여부
    pub fn contains(&self, field: Field) -> bool {
        self.fields().any(|f| f == field)
    }

    /// 자리표시자를 한 번의 순회로 치환합니다.
    ///
    /// 치환된 값은 다시 해석하지 않으므로 사용자 입력에 `{{...}}` 가
    /// 들어 있어도 그대로 출력됩니다.
    pub fn render<F>(&self, mut value_of: F) -> String
    where
        F: FnMut(Field) -> String,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(&value_of(*field)),
            }
        }
        out
    }
}
