use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};

use super::constants::{
    EMPTY_MARKER, INPUT_MEETING_DESCRIPTION, INPUT_MEETING_HOST, INPUT_MEETING_TITLE,
    INPUT_OPTION_STATISTICS, INPUT_PARTICIPANT_SELECTIONS, INPUT_VOTED_PARTICIPANTS,
    UNKNOWN_USER,
};
use super::dto::MeetingSummaryInput;
use super::template::{Field, PromptTemplate};

/// 모임 입력을 템플릿에 채워 최종 프롬프트를 만듭니다.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: Arc<PromptTemplate>,
}

impl PromptAssembler {
    pub fn new(template: Arc<PromptTemplate>) -> Self {
        Self { template }
    }

    pub fn assemble(&self, input: &MeetingSummaryInput) -> String {
        self.template.render(|field| match field {
            Field::Title => format!("{}{}", INPUT_MEETING_TITLE, input.title),
            Field::Description => format!("{}{}", INPUT_MEETING_DESCRIPTION, input.description),
            Field::Host => format!("{}{}", INPUT_MEETING_HOST, host_name(input)),
            Field::VotedParticipants => render_voted_participants(&input.voted_participants),
            Field::OptionStatistics => render_option_statistics(&input.participant_selections),
            Field::ParticipantSelections => {
                render_participant_selections(&input.participant_selections)
            }
        })
    }
}

fn host_name(input: &MeetingSummaryInput) -> &str {
    input
        .host
        .as_deref()
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .unwrap_or(UNKNOWN_USER)
}

fn render_voted_participants(participants: &[String]) -> String {
    if participants.is_empty() {
        return format!("{}0", INPUT_VOTED_PARTICIPANTS);
    }
    format!(
        "{}{} ({})",
        INPUT_VOTED_PARTICIPANTS,
        participants.len(),
        participants.join(", ")
    )
}

/// 참여자 한 명당 한 줄
fn render_participant_selections(selections: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from(INPUT_PARTICIPANT_SELECTIONS);
    for (participant, options) in selections {
        let rendered = if options.is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            options
                .iter()
                .map(|option| format_option(option))
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!("- {}: {}\n", participant, rendered));
    }
    out
}

/// 선택 항목별 집계
///
/// 가능 인원 내림차순, 같으면 항목 오름차순으로 정렬합니다.
fn render_option_statistics(selections: &BTreeMap<String, Vec<String>>) -> String {
    let mut by_option: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (participant, options) in selections {
        for option in options {
            by_option
                .entry(option.as_str())
                .or_default()
                .insert(participant.as_str());
        }
    }

    let mut ranked: Vec<(&str, BTreeSet<&str>)> = by_option.into_iter().collect();
    ranked.sort_by(|(a_option, a), (b_option, b)| {
        b.len().cmp(&a.len()).then_with(|| a_option.cmp(b_option))
    });

    let total = selections.len();
    let mut out = String::from(INPUT_OPTION_STATISTICS);
    for (option, available) in &ranked {
        let unavailable: Vec<&str> = selections
            .keys()
            .map(String::as_str)
            .filter(|participant| !available.contains(participant))
            .collect();

        out.push_str(&format!(
            "- {}: {}명 / {}명\n",
            format_option(option),
            available.len(),
            total
        ));
        out.push_str(&format!("  * 가능: {}\n", join_or_marker(available.iter().copied())));
        out.push_str(&format!("  * 불가능: {}\n", join_or_marker(unavailable.into_iter())));
    }
    out
}

fn join_or_marker<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        joined
    }
}

/// "YYYY-MM-DD" 형식이면 요일을 붙입니다. 예: "2025-12-09" -> "2025-12-09 (화)"
fn format_option(option: &str) -> String {
    match NaiveDate::parse_from_str(option, "%Y-%m-%d") {
        Ok(date) => format!("{} ({})", option, korean_weekday(date.weekday())),
        Err(_) => option.to_string(),
    }
}

fn korean_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "월",
        Weekday::Tue => "화",
        Weekday::Wed => "수",
        Weekday::Thu => "목",
        Weekday::Fri => "금",
        Weekday::Sat => "토",
        Weekday::Sun => "일",
    }
}
