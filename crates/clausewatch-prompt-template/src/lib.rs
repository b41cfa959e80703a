//! Prompt construction for clausewatch
//!
//! This crate owns the contract between the prompt and the response parser:
//! the [`MarkerBlock`] tags the model is asked to emit, the available
//! [`PromptTemplate`] languages, and [`build_prompt`].

use serde::{Deserialize, Serialize};

/// One of the three tagged sections the model is instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerBlock {
    /// `score, tier, trap count`
    Data,
    /// Narrative analysis
    Report,
    /// Negotiation script
    Tips,
}

impl MarkerBlock {
    /// All blocks, in the order the prompt requests them.
    pub const ALL: [MarkerBlock; 3] = [Self::Data, Self::Report, Self::Tips];

    #[must_use]
    pub const fn open_tag(self) -> &'static str {
        match self {
            Self::Data => "[BLOCK_DATA]",
            Self::Report => "[BLOCK_REPORT]",
            Self::Tips => "[BLOCK_TIPS]",
        }
    }

    #[must_use]
    pub const fn close_tag(self) -> &'static str {
        match self {
            Self::Data => "[/BLOCK_DATA]",
            Self::Report => "[/BLOCK_REPORT]",
            Self::Tips => "[/BLOCK_TIPS]",
        }
    }

    /// Wrap `body` in this block's tags.
    #[must_use]
    pub fn wrap(self, body: &str) -> String {
        format!("{}{}{}", self.open_tag(), body, self.close_tag())
    }
}

/// Prompt language.
///
/// Both templates request the same three marker blocks, so the response parser
/// does not care which one produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptTemplate {
    /// Traditional Chinese (Taiwan)
    #[default]
    #[serde(rename = "zh-TW")]
    TraditionalChinese,
    /// English
    #[serde(rename = "en")]
    English,
}

impl PromptTemplate {
    /// Parse a template name string into a PromptTemplate
    ///
    /// # Errors
    ///
    /// Returns an error if template name is not recognized.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "zh-tw" | "zh_tw" | "zh" | "zh-hant" => Ok(Self::TraditionalChinese),
            "en" | "en-us" | "english" => Ok(Self::English),
            _ => Err(format!(
                "Unknown prompt template '{}'. Available templates: zh-TW, en",
                s
            )),
        }
    }

    /// Get template name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TraditionalChinese => "zh-TW",
            Self::English => "en",
        }
    }

    /// Placeholder shown when the answer carries no negotiation block.
    #[must_use]
    pub const fn missing_tips_placeholder(&self) -> &'static str {
        match self {
            Self::TraditionalChinese => "（模型未提供談判話術）",
            Self::English => "(The model did not provide a negotiation script.)",
        }
    }

    const fn body(&self) -> &'static str {
        match self {
            Self::TraditionalChinese => ZH_TW_TEMPLATE,
            Self::English => EN_TEMPLATE,
        }
    }
}

const CONTRACT_SLOT: &str = "{contract_text}";

const ZH_TW_TEMPLATE: &str = "\
你是一位專精台灣法律的資深合約律師，代表簽約的弱勢一方審閱以下合約。
請找出對使用者不利的條款、隱藏的陷阱與模糊的用語，並嚴格依照下列格式輸出三個區塊，區塊之外不要輸出任何文字：

[BLOCK_DATA]風險分數(0-100的整數), 風險等級(高/中/低), 陷阱數量(整數)[/BLOCK_DATA]
[BLOCK_REPORT]
逐條說明風險條款：引用原文、說明對使用者的影響、給出修改建議。
[/BLOCK_REPORT]
[BLOCK_TIPS]
提供可直接對另一方使用的談判話術，語氣專業且具體。
[/BLOCK_TIPS]

合約內容如下：
----------------
{contract_text}
----------------
";

const EN_TEMPLATE: &str = "\
You are a senior contract lawyer reviewing the following agreement on behalf of the weaker signing party.
Identify clauses that disadvantage the user, hidden traps and vague wording. Reply with exactly three blocks, in this order, and nothing outside them:

[BLOCK_DATA]risk score (integer 0-100), risk tier (high/medium/low), trap count (integer)[/BLOCK_DATA]
[BLOCK_REPORT]
For each risky clause: quote it, explain the impact on the user and propose a revision.
[/BLOCK_REPORT]
[BLOCK_TIPS]
Negotiation language the user can send to the other party, professional and specific.
[/BLOCK_TIPS]

Contract:
----------------
{contract_text}
----------------
";

/// Fill `template` with the contract text.
///
/// The text is embedded verbatim. Marker substrings inside the contract are not
/// escaped, so a contract that quotes a marker tag can confuse the parser.
#[must_use]
pub fn build_prompt(template: PromptTemplate, contract_text: &str) -> String {
    let body = template.body();
    let mut prompt = String::with_capacity(body.len() + contract_text.len());
    match body.split_once(CONTRACT_SLOT) {
        Some((head, tail)) => {
            prompt.push_str(head);
            prompt.push_str(contract_text);
            prompt.push_str(tail);
        }
        None => prompt.push_str(body),
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_templates() {
        assert_eq!(
            PromptTemplate::parse("zh-TW").unwrap(),
            PromptTemplate::TraditionalChinese
        );
        assert_eq!(PromptTemplate::parse("EN").unwrap(), PromptTemplate::English);
        assert_eq!(
            PromptTemplate::parse(" zh ").unwrap(),
            PromptTemplate::TraditionalChinese
        );
    }

    #[test]
    fn test_parse_invalid_template() {
        let err = PromptTemplate::parse("klingon").unwrap_err();
        assert!(err.contains("klingon"));
        assert!(err.contains("zh-TW, en"));
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for template in [PromptTemplate::TraditionalChinese, PromptTemplate::English] {
            assert_eq!(PromptTemplate::parse(template.as_str()).unwrap(), template);
        }
    }

    #[test]
    fn test_prompt_requests_blocks_in_order() {
        for template in [PromptTemplate::TraditionalChinese, PromptTemplate::English] {
            let prompt = build_prompt(template, "contract");
            let positions: Vec<usize> = MarkerBlock::ALL
                .iter()
                .map(|block| prompt.find(block.open_tag()).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
            for block in MarkerBlock::ALL {
                assert!(prompt.contains(block.close_tag()));
            }
        }
    }

    #[test]
    fn test_contract_with_braces_is_not_reinterpreted() {
        let text = "Party {contract_text} agrees to pay {amount}";
        let prompt = build_prompt(PromptTemplate::English, text);
        assert_eq!(prompt.matches(text).count(), 1);
    }

    proptest! {
        #[test]
        fn prop_contract_embedded_verbatim(text in ".*") {
            let prompt = build_prompt(PromptTemplate::TraditionalChinese, &text);
            prop_assert!(prompt.contains(&text));
            prop_assert_eq!(build_prompt(PromptTemplate::TraditionalChinese, &text), prompt);
        }
    }
}
