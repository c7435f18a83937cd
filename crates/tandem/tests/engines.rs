//! Engine equivalence tests: every scenario runs through both the stack-safe
//! VM and the recursive reference interpreter, and the two must agree on
//! values, error shapes, name chains and positions.

use std::fmt::Debug;

use tandem::syntax::{
    self, char_, char_in, digit, digits, end, letter, letters, string, succeed, suspend,
};
use tandem::{Either, Implementation, ParserError, Syntax};

/// Parse with both engines, demand identical results, return one of them.
fn parse_both<V>(syntax: &Syntax<String, V>, input: &str) -> Result<V, ParserError<String>>
where
    V: Clone + PartialEq + Debug + 'static,
{
    let stack_safe = syntax.parse_string_with(input, Implementation::StackSafe);
    let recursive = syntax.parse_string_with(input, Implementation::Recursive);
    assert_eq!(
        stack_safe, recursive,
        "engines disagree on input {:?}",
        input
    );
    stack_safe
}

fn failure(chain: &[&str], position: usize, message: &str) -> ParserError<String> {
    ParserError::Failure {
        name_chain: chain.iter().map(|s| s.to_string()).collect(),
        position,
        failure: message.to_string(),
    }
}

#[test]
fn char_in_single_character() {
    let syntax = char_in("A");
    assert_eq!(parse_both(&syntax, "A"), Ok('A'));
    assert_eq!(
        parse_both(&syntax, "B"),
        Err(failure(&[], 0, "not one of 'A'"))
    );
}

#[test]
fn trailing_input_is_not_consumed_all() {
    let syntax = char_in("0123456789").repeat1().zip_left(end());
    assert_eq!(
        parse_both(&syntax, "123x"),
        Err(ParserError::NotConsumedAll { position: 3 })
    );
    assert_eq!(parse_both(&syntax, "123"), Ok(vec!['1', '2', '3']));
}

#[test]
fn or_else_selects_second_branch() {
    let syntax = string("true", true).or_else(string("false", false));
    assert_eq!(parse_both(&syntax, "false"), Ok(false));
    assert_eq!(parse_both(&syntax, "true"), Ok(true));
}

#[test]
fn or_else_retains_both_errors() {
    let syntax = string("true", true).or_else(string("false", false));
    let result = parse_both(&syntax, "nope");
    assert_eq!(
        result,
        Err(ParserError::AllBranchesFailed {
            left: Box::new(failure(&[], 0, "not 'true'")),
            right: Box::new(failure(&[], 0, "not 'false'")),
        })
    );
}

#[test]
fn repeat_with_separator_round() {
    let syntax = digit().repeat_with_sep(char_(','));
    assert_eq!(parse_both(&syntax, "1,2,3"), Ok(vec!['1', '2', '3']));
    assert_eq!(parse_both(&syntax, "7"), Ok(vec!['7']));
    assert_eq!(parse_both(&syntax, ""), Ok(vec![]));
}

#[test]
fn named_scope_is_recorded_at_the_failure() {
    let syntax = digit()
        .repeat1()
        .repeat_with_sep1(char_('.'))
        .named("ip");
    let result = parse_both(&syntax, "1.2.x");
    assert_eq!(result, Err(failure(&["ip"], 4, "not a digit")));
}

#[test]
fn nested_names_stack_outermost_first() {
    let syntax = digit().named("digit").named("version");
    assert_eq!(
        parse_both(&syntax, "x"),
        Err(failure(&["version", "digit"], 0, "not a digit"))
    );
}

#[test]
fn name_does_not_leak_into_sibling_branch() {
    let syntax = digit().named("left").or_else(letter().named("right"));
    let result = parse_both(&syntax, "!");
    assert_eq!(
        result,
        Err(ParserError::AllBranchesFailed {
            left: Box::new(failure(&["left"], 0, "not a digit")),
            right: Box::new(failure(&["right"], 0, "not a letter")),
        })
    );
}

#[test]
fn manual_backtracking_commits_consumed_input() {
    // The left branch consumes 'a' before failing; by default the right
    // branch is not tried.
    let a = char_in("a").zip(char_in("b")).transform(|_| 1, |_| ('a', 'b'));
    let b = char_in("a").zip(char_in("x")).transform(|_| 2, |_| ('a', 'x'));
    let syntax = a.or_else(b);
    assert_eq!(parse_both(&syntax, "ax"), Err(failure(&[], 1, "not one of 'b'")));
}

#[test]
fn auto_backtracking_retries_from_the_entry_index() {
    let a = char_in("a").zip(char_in("b")).transform(|_| 1, |_| ('a', 'b'));
    let b = char_in("a").zip(char_in("x")).transform(|_| 2, |_| ('a', 'x'));
    let syntax = a.or_else(b).auto_backtracking();
    assert_eq!(parse_both(&syntax, "ax"), Ok(2));
    assert_eq!(parse_both(&syntax, "ab"), Ok(1));
}

#[test]
fn backtrack_marks_a_single_branch_retryable() {
    let a = char_in("a").zip(char_in("b")).transform(|_| 1, |_| ('a', 'b'));
    let b = char_in("a").zip(char_in("x")).transform(|_| 2, |_| ('a', 'x'));
    let syntax = a.backtrack().or_else(b);
    assert_eq!(parse_both(&syntax, "ax"), Ok(2));
}

#[test]
fn backtracking_scope_is_restored_on_exit() {
    // The inner subtree enables auto-backtracking; the outer or_else is
    // still manual and must commit a consumed failure.
    let ab = char_in("a").zip(char_in("b")).transform(|_| 1, |_| ('a', 'b'));
    let ac = char_in("a").zip(char_in("c")).transform(|_| 2, |_| ('a', 'c'));
    let inner = ab.or_else(ac).auto_backtracking();
    let outer = inner.or_else(succeed(0));
    assert_eq!(parse_both(&outer, "ac"), Ok(2));
    // Both inner branches consumed 'a'. The restore between them happened
    // under the inner flag, but the flag is back to manual when the inner
    // or_else fails as a whole, so the outer alternative is not tried.
    let result = parse_both(&outer, "ax");
    assert_eq!(
        result,
        Err(ParserError::AllBranchesFailed {
            left: Box::new(failure(&[], 1, "not one of 'b'")),
            right: Box::new(failure(&[], 1, "not one of 'c'")),
        })
    );
}

#[test]
fn repeat_minimality() {
    let syntax = digit().at_least(2);
    assert_eq!(parse_both(&syntax, "123"), Ok(vec!['1', '2', '3']));
    assert_eq!(parse_both(&syntax, "12x"), Ok(vec!['1', '2']));
    assert_eq!(parse_both(&syntax, "1x"), Err(failure(&[], 1, "not a digit")));
}

#[test]
fn repeat_respects_max() {
    let syntax = digit().repeat(1, Some(2)).zip(digits());
    let result = parse_both(&syntax, "1234");
    assert_eq!(result, Ok((vec!['1', '2'], "34".to_string())));
}

#[test]
fn optional_swallows_only_clean_failures() {
    let syntax = digit().optional();
    assert_eq!(parse_both(&syntax, "5"), Ok(Some('5')));
    assert_eq!(parse_both(&syntax, "x"), Ok(None));
    assert_eq!(parse_both(&syntax, ""), Ok(None));

    // A consuming failure inside optional propagates under manual
    // backtracking.
    let pair = char_in("a").zip(char_in("b")).optional();
    assert_eq!(parse_both(&pair, "ax"), Err(failure(&[], 1, "not one of 'b'")));
    assert_eq!(parse_both(&pair, "ab"), Ok(Some(('a', 'b'))));
}

#[test]
fn or_else_either_tags_the_branch() {
    let syntax = digits().or_else_either(letters());
    assert_eq!(parse_both(&syntax, "42"), Ok(Either::Left("42".to_string())));
    assert_eq!(parse_both(&syntax, "abc"), Ok(Either::Right("abc".to_string())));
}

#[test]
fn not_succeeds_without_consuming() {
    let syntax = digit()
        .not("unexpected digit".to_string())
        .zip_right(letter());
    assert_eq!(parse_both(&syntax, "q"), Ok('q'));
    assert_eq!(parse_both(&syntax, "5"), Err(failure(&[], 0, "unexpected digit")));
}

#[test]
fn capture_string_spans_the_consumed_input() {
    let syntax = digit().repeat1().capture_string();
    assert_eq!(parse_both(&syntax, "123"), Ok("123".to_string()));
}

#[test]
fn index_reports_the_position() {
    let syntax = digit().zip(syntax::index());
    assert_eq!(parse_both(&syntax, "7"), Ok(('7', 1usize)));
}

#[test]
fn transform_either_fails_at_the_entry_index() {
    let number = digits().transform_either(
        |s| s.parse::<u32>().map_err(|_| "number too large".to_string()),
        |n: u32| Ok(n.to_string()),
    );
    assert_eq!(parse_both(&number, "42"), Ok(42));
    assert_eq!(
        parse_both(&number, "99999999999999999999"),
        Err(failure(&[], 0, "number too large"))
    );
}

#[test]
fn filter_rejects_at_the_entry_index() {
    let syntax = letters().filter(|s: &String| s.len() <= 3, "too long".to_string());
    assert_eq!(parse_both(&syntax, "abc"), Ok("abc".to_string()));
    assert_eq!(parse_both(&syntax, "abcd"), Err(failure(&[], 0, "too long")));
}

#[test]
fn repeat_until_consumes_the_stop() {
    let syntax = syntax::any_char()
        .repeat_until(string(";", ()))
        .zip(syntax::index());
    assert_eq!(parse_both(&syntax, "ab;"), Ok((vec!['a', 'b'], 3usize)));
}

#[test]
fn end_of_input_is_reported() {
    let syntax = digit();
    assert_eq!(parse_both(&syntax, ""), Err(ParserError::UnexpectedEndOfInput));
}

#[test]
fn map_error_rewrites_the_failure() {
    let syntax = digit().map_error(|e| format!("wanted a digit, {}", e));
    assert_eq!(
        parse_both(&syntax, "x"),
        Err(failure(&[], 0, "wanted a digit, not a digit"))
    );
}

// -----------------------------------------------------------------------------
// Recursive grammars
// -----------------------------------------------------------------------------

/// Balanced parentheses, counting the nesting depth.
fn parens() -> Syntax<String, usize> {
    let deeper = char_('(')
        .zip_right(suspend(parens))
        .zip_left(char_(')'))
        .transform_to(
            |n| Some(n + 1),
            |n: usize| n.checked_sub(1),
            "no nesting level left".to_string(),
        );
    deeper.or_else(succeed(0))
}

#[test]
fn recursive_grammar_agrees_between_engines() {
    let syntax = parens().zip_left(end());
    for depth in [0usize, 1, 5, 100] {
        let input = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_both(&syntax, &input), Ok(depth));
    }
}

#[test]
fn stack_safe_engine_handles_deep_nesting() {
    // A depth the recursive oracle cannot survive, so only the stack-safe
    // engine runs here.
    let depth = 10_000;
    let input = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
    let syntax = parens().zip_left(end());
    assert_eq!(syntax.parse_string(&input), Ok(depth));
}
