//! Fixed idioms that follow a bot mention: `<@U> is ...` and `<@U> can [not] ...`.
//!
//! Rules are data, evaluated in order. Adding an idiom means adding a row to
//! [`VERB_RULES`]; the tokenizer and router stay untouched.

use crate::routing::tokenizer::mentioned_user_id;

/// Builds the argument list from the leading mention and the words after the verb.
pub type ArgumentRewrite = fn(&str, &[String]) -> Vec<String>;

#[derive(Clone, Copy, Debug)]
pub struct VerbRule {
    pub verb: &'static str,
    pub skill: &'static str,
    pub rewrite: ArgumentRewrite,
}

pub static VERB_RULES: &[VerbRule] = &[
    VerbRule { verb: "is", skill: "who", rewrite: rewrite_who },
    VerbRule { verb: "can", skill: "can", rewrite: rewrite_can },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SugarOutcome {
    NotApplicable,
    Rewritten { skill: &'static str, arguments: Vec<String> },
    UnknownVerb { mention: String, arguments: Vec<String> },
}

pub fn expand(words: &[String]) -> SugarOutcome {
    expand_with(VERB_RULES, words)
}

pub fn expand_with(rules: &[VerbRule], words: &[String]) -> SugarOutcome {
    let Some((mention, after_mention)) = words.split_first() else {
        return SugarOutcome::NotApplicable;
    };
    if mentioned_user_id(mention).is_none() {
        return SugarOutcome::NotApplicable;
    }

    let rule = after_mention
        .first()
        .and_then(|verb| rules.iter().find(|rule| rule.verb == verb.as_str()));

    match rule {
        Some(rule) => SugarOutcome::Rewritten {
            skill: rule.skill,
            arguments: (rule.rewrite)(mention, &after_mention[1..]),
        },
        None => SugarOutcome::UnknownVerb {
            mention: mention.clone(),
            arguments: after_mention.to_vec(),
        },
    }
}

fn rewrite_who(mention: &str, rest: &[String]) -> Vec<String> {
    let mut arguments = Vec::with_capacity(rest.len() + 2);
    arguments.push("is".to_owned());
    arguments.push(mention.to_owned());
    arguments.extend_from_slice(rest);
    arguments
}

fn rewrite_can(mention: &str, rest: &[String]) -> Vec<String> {
    let mut arguments = Vec::with_capacity(rest.len() + 2);
    let rest = match rest.split_first() {
        Some((first, tail)) if first == "not" => {
            arguments.push("not".to_owned());
            tail
        }
        _ => rest,
    };
    arguments.push(mention.to_owned());
    arguments.extend_from_slice(rest);
    arguments
}

#[cfg(test)]
mod tests {
    use super::{expand, expand_with, SugarOutcome, VerbRule};

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(ToOwned::to_owned).collect()
    }

    fn joined(outcome: &SugarOutcome) -> String {
        match outcome {
            SugarOutcome::Rewritten { arguments, .. }
            | SugarOutcome::UnknownVerb { arguments, .. } => arguments.join(" "),
            SugarOutcome::NotApplicable => String::new(),
        }
    }

    #[test]
    fn plain_words_are_not_sugar() {
        assert_eq!(expand(&words("deploy web")), SugarOutcome::NotApplicable);
        assert_eq!(expand(&[]), SugarOutcome::NotApplicable);
    }

    #[test]
    fn can_without_negation_drops_the_verb() {
        let outcome = expand(&words("<@U1> can dance"));

        assert!(matches!(outcome, SugarOutcome::Rewritten { skill: "can", .. }));
        assert_eq!(joined(&outcome), "<@U1> dance");
    }

    #[test]
    fn verbs_match_exactly() {
        let outcome = expand(&words("<@U1> Is tall"));

        assert!(matches!(
            outcome,
            SugarOutcome::UnknownVerb { ref mention, .. } if mention == "<@U1>"
        ));
        assert_eq!(joined(&outcome), "Is tall");
    }

    #[test]
    fn lone_mention_has_no_verb() {
        let outcome = expand(&words("<@U1>"));

        assert!(matches!(
            outcome,
            SugarOutcome::UnknownVerb { ref arguments, .. } if arguments.is_empty()
        ));
    }

    #[test]
    fn custom_rule_tables_are_honored() {
        fn rewrite(mention: &str, rest: &[String]) -> Vec<String> {
            let mut arguments = vec![mention.to_owned()];
            arguments.extend_from_slice(rest);
            arguments
        }
        let rules = [VerbRule { verb: "likes", skill: "likes", rewrite }];
        let outcome = expand_with(&rules, &words("<@U1> likes pizza"));

        assert!(matches!(outcome, SugarOutcome::Rewritten { skill: "likes", .. }));
        assert_eq!(joined(&outcome), "<@U1> pizza");
    }
}
