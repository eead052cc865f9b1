use pest::{Parser, iterators::Pair};
use pest_derive::Parser;

use crate::ast::Token;

#[derive(Parser)]
#[grammar = "src/template.pest"]
pub struct TemplateParser;

impl TemplateParser {
    /// Parse a macro template into literal runs and positional markers
    pub fn parse_template<'a>(input: &'a str) -> Result<Vec<Token<'a>>, pest::error::Error<Rule>> {
        let mut pairs = TemplateParser::parse(Rule::template, input)?;
        let Some(template) = pairs.next() else {
            return Ok(Vec::new());
        };

        Ok(template
            .into_inner()
            .filter_map(Self::parse_token)
            .collect::<Vec<_>>())
    }

    fn parse_token(pair: Pair<'_, Rule>) -> Option<Token<'_>> {
        match pair.as_rule() {
            Rule::positional => pair.as_str()[1..].parse().ok().map(Token::Positional),
            Rule::literal => Some(Token::Literal(pair.as_str())),
            _ => None,
        }
    }
}
