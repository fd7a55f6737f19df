use crate::models::Goal;

/// Heading of each report section. The model is told to use these verbatim,
/// and `ReportOutline` looks for them in the result.
pub const SECTION_HEADINGS: [&str; 3] = [
    "## 1. 학년별 핵심 활동 요약",
    "## 2. 전공 적합성 및 역량 평가",
    "## 3. 합격을 부르는 심화 활동 제안",
];

pub struct PromptTemplate;

impl PromptTemplate {
    pub fn render(goal: &Goal) -> String {
        let goal = goal.as_str();
        let [summary, evaluation, proposals] = SECTION_HEADINGS;

        format!(
            r#"당신은 대한민국 최고의 대입 입학사정관이자 진로 컨설턴트입니다.
첨부된 고등학교 생활기록부(PDF)를 꼼꼼히 분석하여 이 학생의 입시 전략을 세워 주십시오.

학생의 희망 진로: {goal}

작성 규칙:
1. 이모지를 사용하지 마십시오.
2. 핵심 키워드, 중요한 수치, 등급은 굵게(** **) 표시하십시오.
3. 마크다운 문법이 깨지지 않도록 작성하십시오.

---

{summary}
학년별로 학생의 역량이 드러나는 활동(교과 세특, 동아리, 진로활동 등)을 3~4줄로 요약하십시오.

* **1학년**:
* **2학년**:
* **3학년**: (기록이 없으면 '자료 없음'으로 표시)

{evaluation}
* **종합 평가**: S/A/B/C 중 하나의 등급과 그 이유
* **강점**: 희망 진로와 관련해 돋보이는 역량
* **약점 및 보완점**: 현재 기록에서 부족하거나 아쉬운 부분

{proposals}
'{goal}' 합격 가능성을 높이기 위해 남은 학기 동안 꼭 해야 할 **구체적인 활동 3가지**를 제안하십시오.
각 활동에는 **탐구 주제(논문 제목 예시)**, **심화 서적**, **수행평가 연계 아이디어**를 모두 포함해야 합니다.

1. **[주제 1]**: ...
2. **[주제 2]**: ...
3. **[주제 3]**: ...
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_is_substituted_everywhere() {
        let prompt = PromptTemplate::render(&Goal::new("컴퓨터공학과").unwrap());

        assert!(prompt.contains("학생의 희망 진로: 컴퓨터공학과"));
        assert!(prompt.contains("'컴퓨터공학과' 합격 가능성"));
        assert!(!prompt.contains("{goal}"));
    }

    #[test]
    fn every_section_heading_is_requested() {
        let prompt = PromptTemplate::render(&Goal::new("의예과").unwrap());

        for heading in SECTION_HEADINGS {
            assert!(prompt.contains(heading), "missing {heading}");
        }
        assert!(prompt.contains("S/A/B/C"));
        assert!(prompt.contains("3. **[주제 3]**"));
    }
}
