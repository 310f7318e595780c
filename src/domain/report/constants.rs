//! 모임 요약 레포트 생성에 쓰이는 상수

/// 기본 프롬프트 템플릿 경로
pub const PROMPT_TEMPLATE_PATH: &str = "prompts/meeting-summary-kr.txt";

pub const INPUT_MEETING_TITLE: &str = "Meeting Title: ";
pub const INPUT_MEETING_DESCRIPTION: &str = "Meeting Description: ";
pub const INPUT_MEETING_HOST: &str = "Meeting Host: ";
pub const INPUT_VOTED_PARTICIPANTS: &str = "Voted Participants: ";
pub const INPUT_PARTICIPANT_SELECTIONS: &str = "Participant Selections:\n";
pub const INPUT_OPTION_STATISTICS: &str =
    "📊 Option Statistics (PRE-CALCULATED - USE THESE EXACT NUMBERS):\n";

/// 호스트를 알 수 없을 때 표시할 이름
pub const UNKNOWN_USER: &str = "Unknown";

/// 빈 목록 표시
pub const EMPTY_MARKER: &str = "-";

/// 레포트 생성 최대 시도 횟수 (기본값)
pub const MAX_RETRY_COUNT: u32 = 5;
