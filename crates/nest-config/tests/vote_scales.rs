use nest_config::{Methodology, VoteScale};

#[test]
fn discrete_scales_accept_their_support_only() {
    assert!(VoteScale::FivePoint.validate(1.0));
    assert!(VoteScale::FivePoint.validate(5.0));
    assert!(!VoteScale::FivePoint.validate(0.0));
    assert!(!VoteScale::FivePoint.validate(6.0));
    assert!(!VoteScale::FivePoint.validate(2.5));
    assert_eq!(VoteScale::ElevenPoint.support().len(), 11);
    assert_eq!(VoteScale::ThreePoint.support(), vec![1, 2, 3]);
    assert_eq!(VoteScale::SevenPoint.support().last(), Some(&7));
}

#[test]
fn forced_choice_is_binary() {
    assert!(VoteScale::TwoAfc.validate(0.0));
    assert!(VoteScale::TwoAfc.validate(1.0));
    assert!(!VoteScale::TwoAfc.validate(2.0));
}

#[test]
fn comparison_scales_are_centered() {
    assert_eq!(VoteScale::CcrThreePoint.support(), vec![-1, 0, 1]);
    assert_eq!(VoteScale::CcrFivePoint.support(), vec![-2, -1, 0, 1, 2]);
    assert!(VoteScale::CcrFivePoint.validate(-2.0));
    assert!(!VoteScale::CcrThreePoint.validate(2.0));
}

#[test]
fn continuous_scale_accepts_fractions() {
    assert!(VoteScale::ZeroToHundred.validate(0.0));
    assert!(VoteScale::ZeroToHundred.validate(42.5));
    assert!(VoteScale::ZeroToHundred.validate(100.0));
    assert!(!VoteScale::ZeroToHundred.validate(100.5));
    assert!(!VoteScale::ZeroToHundred.validate(f64::NAN));
    assert!(VoteScale::ZeroToHundred.support().is_empty());
}

#[test]
fn scales_use_configuration_labels() {
    let parsed: VoteScale = serde_json::from_str("\"2AFC\"").expect("parse");
    assert_eq!(parsed, VoteScale::TwoAfc);
    let parsed: VoteScale = serde_json::from_str("\"0_TO_100\"").expect("parse");
    assert_eq!(parsed.to_string(), "0_TO_100");
    assert!(serde_json::from_str::<VoteScale>("\"TEN_POINT\"").is_err());
}

#[test]
fn methodologies_pair_with_their_scales() {
    assert!(Methodology::Acr.supports(VoteScale::FivePoint));
    assert!(Methodology::Dcr.supports(VoteScale::ElevenPoint));
    assert!(!Methodology::Acr.supports(VoteScale::ZeroToHundred));
    assert!(Methodology::Acr5c.supports(VoteScale::ZeroToHundred));
    assert!(Methodology::Tafc.supports(VoteScale::TwoAfc));
    assert!(Methodology::Ccr.supports(VoteScale::CcrFivePoint));
    assert!(!Methodology::Ccr.supports(VoteScale::FivePoint));
    assert!(Methodology::Samviq.supports(VoteScale::ZeroToHundred));
    assert!(Methodology::Samviq5d.supports(VoteScale::FivePoint));
    assert!(!Methodology::Samviq5d.supports(VoteScale::ZeroToHundred));
    assert_eq!(Methodology::Samviq5d.as_str(), "samviq5d");
}
