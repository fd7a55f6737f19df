use regex::Regex;
use std::sync::OnceLock;

pub const EXPECTED_PROPOSALS: usize = 3;

/// A report in the shape the prompt asks for. Served by the mock backend.
pub const SAMPLE_REPORT: &str = "## 1. 학년별 핵심 활동 요약
* **1학년**: 정보 교과 세특에서 **파이썬 기초 프로젝트**를 수행하고 코딩 동아리에 가입함.
* **2학년**: 수학 세특에서 **행렬 연산**을 이미지 처리와 연결해 탐구함.
* **3학년**: 자료 없음

## 2. 전공 적합성 및 역량 평가
* **종합 평가**: **A** 등급. 전공 관련 탐구가 꾸준하지만 심화 단계의 결과물이 부족함.
* **강점**: 수학적 개념을 프로그래밍 문제로 옮기는 능력
* **약점 및 보완점**: 팀 단위 협업 경험과 알고리즘 심화 활동이 보이지 않음

## 3. 합격을 부르는 심화 활동 제안
1. **[주제 1]**: 탐구 주제 '그래프 탐색 알고리즘을 활용한 교내 동선 최적화', 심화 서적 **알고리즘 문제 해결 전략**, 정보 수행평가 보고서로 연계
2. **[주제 2]**: 탐구 주제 '행렬 분해를 이용한 이미지 압축 비교', 심화 서적 **선형대수와 군**, 수학 수행평가 발표로 연계
3. **[주제 3]**: 탐구 주제 '공개 데이터로 본 급식 잔반 예측 모델', 심화 서적 **밑바닥부터 시작하는 딥러닝**, 통계 수행평가 프로젝트로 연계
";

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,2}\s*([1-3])\.").unwrap())
}

fn next_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,2}\s").unwrap())
}

fn grade_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)종합 평가[^\n]*?(?:^|[^A-Za-z])([SABC][+\-]?)(?:[^A-Za-z+\-]|$)").unwrap()
    })
}

fn proposal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // top-level items only; indented sub-points belong to the item above
    RE.get_or_init(|| Regex::new(r"(?m)^(?:#{3,6}[ \t]*)?\d+\.[ \t]+\S").unwrap())
}

/// Structural view of a generated report, used to judge whether the model
/// followed the requested layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutline {
    pub sections: [bool; 3],
    pub grade: Option<String>,
    pub proposals: usize,
}

impl ReportOutline {
    pub fn parse(text: &str) -> Self {
        let mut sections = [false; 3];
        let mut proposals_start = None;

        for caps in section_regex().captures_iter(text) {
            let index = match caps[1].parse::<usize>() {
                Ok(n) => n - 1,
                Err(_) => continue,
            };
            sections[index] = true;
            if index == 2 && proposals_start.is_none() {
                proposals_start = caps.get(0).map(|m| m.end());
            }
        }

        let proposals = proposals_start
            .map(|start| {
                let body = &text[start..];
                let body = match next_heading_regex().find(body) {
                    Some(m) => &body[..m.start()],
                    None => body,
                };
                proposal_regex().find_iter(body).count()
            })
            .unwrap_or(0);

        let grade = grade_regex()
            .captures(text)
            .map(|caps| caps[1].to_string());

        Self {
            sections,
            grade,
            proposals,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(|&present| present) && self.proposals == EXPECTED_PROPOSALS
    }
}
