//! ReportParser: turns the raw evaluation report into an `AnalysisResult`.
//!
//! Never fails. A section whose header is missing degrades to
//! `SECTION_FALLBACK` and is logged together with the full raw report.

use tracing::warn;

use crate::analysis::grammar::{Section, SectionGrammar, SectionStrategy, StrategyKind};
use crate::models::{AnalysisResult, AnalysisStatus, EvaluationReport};

pub const SECTION_FALLBACK: &str = "분석 결과에서 해당 항목을 읽어오지 못했습니다.";

/// Parser output: the result plus which sections fell back.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub result: AnalysisResult,
    pub degraded: Vec<Section>,
}

impl ParsedReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

pub struct ReportParser {
    grammar_version: &'static str,
    strategy: Box<dyn SectionStrategy>,
}

impl ReportParser {
    pub fn new(grammar: SectionGrammar, kind: StrategyKind) -> Result<Self, regex::Error> {
        Ok(Self {
            grammar_version: grammar.version,
            strategy: kind.build(grammar)?,
        })
    }

    pub fn parse(&self, report: &EvaluationReport) -> ParsedReport {
        let mut bodies = self.strategy.split(&report.raw_text);
        let mut degraded = Vec::new();

        let mut take = |section: Section| match bodies[section.index()].take() {
            Some(body) => body,
            None => {
                warn!(
                    section = %section,
                    grammar = self.grammar_version,
                    strategy = self.strategy.name(),
                    raw_report = %report.raw_text,
                    "section not found in report, using fallback"
                );
                degraded.push(section);
                SECTION_FALLBACK.to_string()
            }
        };

        let result = AnalysisResult {
            strengths: take(Section::Strengths),
            weaknesses: take(Section::Weaknesses),
            suggestions: take(Section::Suggestions),
            status: AnalysisStatus::Completed,
        };

        ParsedReport { result, degraded }
    }
}
