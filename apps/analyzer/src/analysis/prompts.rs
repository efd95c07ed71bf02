// Evaluation prompt templates.
// Section headers here must stay in sync with `grammar::SectionGrammar::v1`.

pub const EVALUATION_SYSTEM: &str = "\
당신은 채용 담당자의 관점에서 이력서를 평가하는 전문 커리어 컨설턴트입니다. \
이력서에 실제로 적힌 내용만을 근거로 평가하고, 없는 경력이나 성과를 지어내지 마세요. \
반드시 요청된 형식과 번호, 제목을 그대로 지켜 답변하세요.";

pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"다음 이력서를 분석해주세요.

[이력서]
{resume_text}

아래 형식을 정확히 지켜 {language}로 작성하세요. 각 항목마다 이력서의 구체적인 내용을 근거로 제시하세요.

1. 강점
- 지원자의 강점과 그렇게 판단한 근거

2. 약점
- 보완이 필요한 부분과 그렇게 판단한 근거

3. 개선점
- 이력서를 더 좋게 만들기 위한 구체적인 제안과 그 이유

규칙:
1) 제목은 "1. 강점", "2. 약점", "3. 개선점" 세 개만 사용하세요.
2) 각 항목의 세부 내용은 번호 대신 "-" 글머리표로 작성하세요.
3) 서론이나 결론, 다른 제목은 추가하지 마세요."#;

pub const DEFAULT_LANGUAGE: &str = "한국어";

/// Resumes longer than this are cut before prompting.
pub const MAX_RESUME_CHARS: usize = 20_000;
