//! Section strategies. Both implement the same boundary rule: a section body
//! runs from the end of its header to the start of the nearest following
//! grammar header, or to the end of the report. Only the first occurrence of
//! each header is a boundary.

use regex::Regex;

use crate::analysis::grammar::{Section, SectionBodies, SectionGrammar, SectionHeader, SectionStrategy};

/// Multi-line, case-insensitive header patterns. Tolerates markdown heading
/// marks, bold/underline decoration, `1.` or `1)` numbering and a trailing colon.
/// The label must end the line or be followed by a colon or closing decoration.
pub struct RegexStrategy {
    headers: Vec<(Section, Regex)>,
}

impl RegexStrategy {
    pub fn new(grammar: SectionGrammar) -> Result<Self, regex::Error> {
        let headers = grammar
            .headers
            .iter()
            .map(|h| Ok((h.section, Regex::new(&header_pattern(h))?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { headers })
    }
}

fn header_pattern(header: &SectionHeader) -> String {
    let labels = header
        .labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        r"(?im)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\*\*|__)?[ \t]*{number}[ \t]*[.)][ \t]*(?:\*\*|__)?[ \t]*(?:{labels})(?:[ \t\r]*$|(?:[ \t]*(?:\*\*|__|:|：))+)",
        number = header.number,
    )
}

impl SectionStrategy for RegexStrategy {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn split(&self, report: &str) -> SectionBodies {
        let spans: Vec<Option<(usize, usize)>> = self
            .headers
            .iter()
            .map(|(_, re)| re.find(report).map(|m| (m.start(), m.end())))
            .collect();

        let mut bodies = SectionBodies::default();
        for ((section, _), span) in self.headers.iter().zip(&spans) {
            let Some((_, body_start)) = *span else {
                continue;
            };
            let body_end = spans
                .iter()
                .flatten()
                .map(|&(start, _)| start)
                .filter(|&start| start >= body_start)
                .min()
                .unwrap_or(report.len());
            bodies[section.index()] = Some(report[body_start..body_end].trim().to_string());
        }
        bodies
    }
}

/// Line-oriented state machine over numbered headers. No regex; useful when
/// header decoration drifts in ways a pattern would over-match.
pub struct ScannerStrategy {
    grammar: SectionGrammar,
}

impl ScannerStrategy {
    pub fn new(grammar: SectionGrammar) -> Self {
        Self { grammar }
    }

    /// Returns the section a header line opens and the text after the label.
    fn match_header<'a>(&self, line: &'a str) -> Option<(Section, &'a str)> {
        let rest = strip_decoration(line.trim_start().trim_start_matches('#').trim_start());

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let number: u8 = rest[..digits_end].parse().ok()?;

        let rest = rest[digits_end..].trim_start();
        let rest = rest
            .strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))?
            .trim_start();
        let rest = strip_decoration(rest);

        self.grammar
            .headers
            .iter()
            .filter(|h| h.number == number)
            .find_map(|h| {
                h.labels.iter().find_map(|label| {
                    let prefix = rest.get(..label.len())?;
                    if !prefix.eq_ignore_ascii_case(label) {
                        return None;
                    }
                    header_tail(&rest[label.len()..]).map(|tail| (h.section, tail))
                })
            })
    }
}

/// Text following a header label, or `None` when the label is only the start
/// of a longer word (`강점이 ...`).
fn header_tail(after: &str) -> Option<&str> {
    let after = after.trim_start_matches([' ', '\t']);
    let closes = after.trim_end().is_empty()
        || after.starts_with([':', '：'])
        || after.starts_with("**")
        || after.starts_with("__");
    closes.then(|| {
        after.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '*' | '_' | ':' | '：'))
    })
}

fn strip_decoration(s: &str) -> &str {
    s.strip_prefix("**")
        .or_else(|| s.strip_prefix("__"))
        .unwrap_or(s)
        .trim_start()
}

impl SectionStrategy for ScannerStrategy {
    fn name(&self) -> &'static str {
        "scanner"
    }

    fn split(&self, report: &str) -> SectionBodies {
        let mut bodies = SectionBodies::default();
        let mut current: Option<usize> = None;

        for line in report.lines() {
            if let Some((section, tail)) = self.match_header(line) {
                let idx = section.index();
                if bodies[idx].is_none() {
                    bodies[idx] = Some(tail.to_string());
                    current = Some(idx);
                    continue;
                }
            }
            if let Some(body) = current.and_then(|idx| bodies[idx].as_mut()) {
                body.push('\n');
                body.push_str(line);
            }
        }

        bodies.map(|body| body.map(|b| b.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategies() -> Vec<Box<dyn SectionStrategy>> {
        vec![
            Box::new(RegexStrategy::new(SectionGrammar::v1()).unwrap()),
            Box::new(ScannerStrategy::new(SectionGrammar::v1())),
        ]
    }

    fn body(bodies: &SectionBodies, section: Section) -> Option<&str> {
        bodies[section.index()].as_deref()
    }

    #[test]
    fn test_plain_headers_split() {
        let report = "1. 강점\n정량적 성과가 명확합니다.\n\n2. 약점\n직무 연관성이 약합니다.\n\n3. 개선점\n프로젝트 역할을 구체화하세요.\n";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("정량적 성과가 명확합니다."), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), Some("직무 연관성이 약합니다."), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("프로젝트 역할을 구체화하세요."), "{}", strategy.name());
        }
    }

    #[test]
    fn test_markdown_decoration_tolerated() {
        let report = "## **1. 강점:**\n- 리더십\n\n**2) 약점**\n- 수치 부족\n\n### 3.  개선점 :\n- 성과 수치화";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("- 리더십"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), Some("- 수치 부족"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("- 성과 수치화"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_english_headers_case_insensitive() {
        let report = "1. STRENGTHS\nGood\n2. Weaknesses\nBad\n3. improvements\nBetter";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("Good"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), Some("Bad"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("Better"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_body_on_header_line_kept() {
        let report = "1. 강점: 꾸준한 오픈소스 기여\n2. 약점: 없음\n3. 개선점: 요약 추가";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("꾸준한 오픈소스 기여"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("요약 추가"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_missing_header_is_none() {
        let report = "1. 강점\n좋음\n3. 개선점\n더 좋게";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("좋음"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), None, "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("더 좋게"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_out_of_order_sections() {
        let report = "2. 약점\nB\n1. 강점\nA\n3. 개선점\nC";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("A"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), Some("B"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("C"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_preamble_ignored_and_multiline_body_kept() {
        let report = "분석 결과입니다.\n\n1. 강점\n첫째 줄\n둘째 줄\n2. 약점\n없음\n3. 개선점\n없음";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("첫째 줄\n둘째 줄"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_no_headers_at_all() {
        for strategy in strategies() {
            let bodies = strategy.split("I cannot evaluate this document.");
            assert!(bodies.iter().all(Option::is_none), "{}", strategy.name());
        }
    }

    #[test]
    fn test_label_prefix_of_longer_word_is_not_a_header() {
        let report = "1. 강점이 돋보이는 이력서입니다.\n\n1. 강점\n리더십\n2. 약점\n없음\n3. 개선점\n요약";
        for strategy in strategies() {
            let bodies = strategy.split(report);
            assert_eq!(body(&bodies, Section::Strengths), Some("리더십"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), Some("없음"), "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("요약"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_label_followed_by_prose_without_colon_is_not_a_header() {
        for strategy in strategies() {
            let bodies = strategy.split("1. Strengthsfinder results\n2. 약점 요약 없음\n3. 개선점 :\n요약");
            assert_eq!(body(&bodies, Section::Strengths), None, "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Weaknesses), None, "{}", strategy.name());
            assert_eq!(body(&bodies, Section::Suggestions), Some("요약"), "{}", strategy.name());
        }
    }

    #[test]
    fn test_header_number_must_match_label() {
        for strategy in strategies() {
            let bodies = strategy.split("2. 강점\n내용");
            assert_eq!(body(&bodies, Section::Strengths), None, "{}", strategy.name());
        }
    }
}
