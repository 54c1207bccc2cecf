use super::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

// =============================================================================
// parsing
// =============================================================================

#[test]
fn parses_count_and_sides() {
    assert_eq!("2d6".parse::<DiceExpr>(), Ok(DiceExpr { count: 2, sides: 6 }));
    assert_eq!("10D100".parse::<DiceExpr>(), Ok(DiceExpr { count: 10, sides: 100 }));
}

#[test]
fn omitted_count_means_one() {
    assert_eq!("d20".parse::<DiceExpr>(), Ok(DiceExpr { count: 1, sides: 20 }));
}

#[test]
fn zero_count_reads_as_one() {
    assert_eq!("0d6".parse::<DiceExpr>(), Ok(DiceExpr { count: 1, sides: 6 }));
}

#[test]
fn zero_sides_is_in_grammar() {
    assert_eq!("d0".parse::<DiceExpr>(), Ok(DiceExpr { count: 1, sides: 0 }));
}

#[test]
fn rejects_out_of_grammar_tokens() {
    for token in ["banana", "2d", "d", "2x6", "2d6+1", "-1d6", " 2d6", "2d6 ", "dd6", "2d-6"] {
        assert!(token.parse::<DiceExpr>().is_err(), "{token} should not parse");
    }
    assert_eq!("".parse::<DiceExpr>(), Err(ParseFallbackError::Empty));
}

#[test]
fn rejects_excessive_dice_count() {
    assert_eq!("1001d6".parse::<DiceExpr>(), Err(ParseFallbackError::TooManyDice(1001)));
    assert!("1000d6".parse::<DiceExpr>().is_ok());
}

#[test]
fn rejects_overflowing_sides() {
    assert!("1d99999999999".parse::<DiceExpr>().is_err());
}

// =============================================================================
// rolling
// =============================================================================

#[test]
fn rolls_stay_within_bounds() {
    let mut rng = rng();
    for (expr, lo, hi) in [("2d6", 2, 12), ("d20", 1, 20), ("10d100", 10, 1000), ("1d1", 1, 1)] {
        let parsed: DiceExpr = expr.parse().expect("valid expression");
        assert_eq!(parsed.bounds(), (lo, hi));
        for _ in 0..200 {
            let result = parsed.roll(&mut rng);
            assert!((lo..=hi).contains(&result), "{expr} rolled {result}");
        }
    }
}

#[test]
fn zero_sided_die_yields_one_per_trial() {
    let mut rng = rng();
    let expr: DiceExpr = "4d0".parse().expect("valid expression");
    assert_eq!(expr.roll(&mut rng), 4);
    assert_eq!(expr.bounds(), (4, 4));
}

#[test]
fn single_die_reaches_both_extremes() {
    let mut rng = rng();
    let expr: DiceExpr = "d4".parse().expect("valid expression");
    let seen: std::collections::HashSet<u64> = (0..500).map(|_| expr.roll(&mut rng)).collect();
    assert_eq!(seen, [1, 2, 3, 4].into_iter().collect());
}

#[test]
fn malformed_expression_falls_back_to_d20() {
    let mut rng = rng();
    for _ in 0..200 {
        let roll = evaluate_with("banana", &mut rng);
        assert_eq!(roll.dice, "banana");
        assert!((1..=20).contains(&roll.result));
    }
}

#[test]
fn evaluate_keeps_expression_as_typed() {
    let roll = evaluate("3D6");
    assert_eq!(roll.dice, "3D6");
    assert!((3..=18).contains(&roll.result));
}

#[test]
fn result_bounds_use_fallback_for_malformed() {
    assert_eq!(result_bounds("3d6"), (3, 18));
    assert_eq!(result_bounds("banana"), (1, 20));
    assert_eq!(result_bounds("d0"), (1, 1));
}

// =============================================================================
// roll command
// =============================================================================

#[test]
fn roll_command_takes_second_token() {
    assert_eq!(roll_command_expression("/roll 2d6"), Some("2d6"));
    assert_eq!(roll_command_expression("/roll   3d8   for damage"), Some("3d8"));
}

#[test]
fn roll_command_defaults_to_d20() {
    assert_eq!(roll_command_expression("/roll"), Some(DEFAULT_DICE));
    assert_eq!(roll_command_expression("  /roll  "), Some(DEFAULT_DICE));
}

#[test]
fn non_roll_input_is_not_a_command() {
    assert_eq!(roll_command_expression("hello table"), None);
    assert_eq!(roll_command_expression("/rolling"), None);
    assert_eq!(roll_command_expression("roll 2d6"), None);
    assert_eq!(roll_command_expression(""), None);
}
