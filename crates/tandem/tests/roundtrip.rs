//! Round-trip law: whenever a syntax parses a value, printing that value and
//! parsing the output yields the same value (the printed text need not be the
//! original text). Plus direct printer behaviour: targets, rollback, chunks.

use std::fmt::Debug;

use indoc::indoc;
use tandem::syntax::{char_, char_in, digit, digits, letters, string, whitespace0};
use tandem::{ChunkTarget, Syntax, Target};

/// Parse, print the value, parse again; both parses must agree.
fn roundtrip<V>(syntax: &Syntax<String, V>, input: &str) -> V
where
    V: Clone + PartialEq + Debug + 'static,
{
    let value = syntax
        .parse_string(input)
        .unwrap_or_else(|e| panic!("parse failed on {:?}: {}", input, e.pretty(input)));
    let printed = syntax
        .print_string(&value)
        .unwrap_or_else(|e| panic!("print failed on {:?}: {}", input, e));
    let reparsed = syntax
        .parse_string(&printed)
        .unwrap_or_else(|e| panic!("reparse failed on {:?}: {}", printed, e.pretty(&printed)));
    assert_eq!(value, reparsed, "round trip changed the value for {:?}", input);
    value
}

#[test]
fn separated_digits_print_back() {
    let csv = digit().repeat_with_sep(char_(','));
    let value = roundtrip(&csv, "1,2,3");
    assert_eq!(value, vec!['1', '2', '3']);
    assert_eq!(csv.print_string(&value).unwrap(), "1,2,3");
}

#[test]
fn keywords_print_their_branch() {
    let boolean = string("true", true).or_else(string("false", false));
    assert_eq!(boolean.print_string(&true).unwrap(), "true");
    assert_eq!(boolean.print_string(&false).unwrap(), "false");
    roundtrip(&boolean, "true");
    roundtrip(&boolean, "false");
}

#[test]
fn numbers_via_transform_either() {
    let number = digits().transform_either(
        |s| s.parse::<u32>().map_err(|_| "number too large".to_string()),
        |n: u32| Ok(n.to_string()),
    );
    assert_eq!(roundtrip(&number, "042"), 42);
    // The printed form is canonical, not the original text.
    assert_eq!(number.print_string(&42).unwrap(), "42");
}

#[test]
fn capture_string_prints_verbatim() {
    let word = letters().capture_string();
    assert_eq!(roundtrip(&word, "hello"), "hello");
}

#[test]
fn optional_prints_nothing_for_none() {
    let syntax = digit().optional();
    assert_eq!(syntax.print_string(&Some('7')).unwrap(), "7");
    assert_eq!(syntax.print_string(&None).unwrap(), "");
    roundtrip(&syntax, "7");
    roundtrip(&syntax, "");
}

#[test]
fn either_prints_the_tagged_branch() {
    let syntax = digits().or_else_either(letters());
    let left = roundtrip(&syntax, "42");
    let right = roundtrip(&syntax, "abc");
    assert_eq!(syntax.print_string(&left).unwrap(), "42");
    assert_eq!(syntax.print_string(&right).unwrap(), "abc");
}

#[test]
fn repeat_until_prints_the_terminator_once() {
    let syntax = char_in("ab").repeat_until(char_(';'));
    let value = roundtrip(&syntax, "ab;");
    assert_eq!(syntax.print_string(&value).unwrap(), "ab;");
}

#[test]
fn whitespace_round_trips() {
    let syntax = whitespace0();
    assert_eq!(roundtrip(&syntax, " \t"), " \t");
    assert_eq!(roundtrip(&syntax, ""), "");
}

#[test]
fn multiline_input_round_trips() {
    let lines = letters().repeat_with_sep(char_('\n'));
    let input = indoc! {"
        alpha
        beta
        gamma"};
    let value = roundtrip(&lines, input);
    assert_eq!(value, vec!["alpha", "beta", "gamma"]);
    assert_eq!(lines.print_string(&value).unwrap(), "alpha\nbeta\ngamma");
}

#[test]
fn mismatched_value_fails_to_print() {
    let keyword = string("yes", 1u8);
    assert_eq!(keyword.print_string(&1).unwrap(), "yes");
    assert!(keyword.print_string(&2).is_err());
}

#[test]
fn filtered_values_fail_to_print() {
    let short = letters().filter(|s: &String| s.len() <= 3, "too long".to_string());
    assert_eq!(short.print_string(&"abc".to_string()).unwrap(), "abc");
    assert_eq!(
        short.print_string(&"abcd".to_string()),
        Err("too long".to_string())
    );
}

#[test]
fn or_else_rolls_back_partial_output() {
    // The left branch prints 'a' before its value assertion fails; the
    // rollback must discard it, leaving only the right branch's output.
    let left = char_('a').zip_right(string("!", 1));
    let right = char_('a').zip_right(string("?", 2));
    let syntax = left.or_else(right);
    assert_eq!(syntax.print_string(&2).unwrap(), "a?");
    assert_eq!(syntax.print_string(&1).unwrap(), "a!");
}

#[test]
fn print_to_chunk_collects_elements() {
    let csv = digit().repeat_with_sep(char_(','));
    let chunk = csv.print_to_chunk(&vec!['1', '2']).unwrap();
    assert_eq!(chunk, vec!['1', ',', '2']);
}

#[test]
fn print_to_target_appends() {
    let syntax = digits();
    let mut target = ChunkTarget::new();
    target.write('#');
    syntax
        .print_to_target(&"42".to_string(), &mut target)
        .unwrap();
    assert_eq!(target.finish_string(), "#42");
}

#[test]
fn printer_rejects_text_the_syntax_cannot_reparse() {
    // PrintRegex verifies the value against the compiled regex.
    let syntax = digits();
    assert!(syntax.print_string(&"4a2".to_string()).is_err());
}
