use rand::SeedableRng;
use rand::rngs::StdRng;

use kegel_matchday::form::{
    FormScale, FormState, FormTrack, advance_all, apply_form_to_strength,
    get_player_total_form_modifier,
};
use kegel_matchday::model::{Attributes, ClubId, Player, PlayerId};
use kegel_matchday::scoring::{EmergencySubstitute, ScoreablePlayer};

fn player(id: u32, strength: u8) -> Player {
    let mut attrs = Attributes::neutral();
    attrs.strength = strength;
    Player::new(PlayerId(id), ClubId(1), format!("P{id}"), attrs)
}

#[test]
fn tracks_stay_within_their_bands() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut state = FormState::default();
    let mut seen_active = [false; 3];
    for _ in 0..2_000 {
        state.advance(&mut rng);
        for (idx, scale) in FormScale::ALL.into_iter().enumerate() {
            let band = scale.band();
            let track = state.track(scale);
            assert!(track.modifier.abs() <= band.amplitude);
            assert!(track.remaining_days <= band.max_days);
            if !track.is_active() {
                assert_eq!(track.modifier, 0.0);
            } else {
                seen_active[idx] = true;
            }
        }
        let sum = state.short.modifier + state.medium.modifier + state.long.modifier;
        assert!((state.total_modifier() - sum).abs() < 1e-12);
        assert!(state.total_modifier().abs() <= 22.0);
    }
    assert_eq!(seen_active, [true; 3]);
}

#[test]
fn active_track_runs_down_then_clears() {
    let mut rng = StdRng::seed_from_u64(1);
    let band = FormScale::Medium.band();
    let mut track = FormTrack {
        modifier: -6.0,
        remaining_days: 3,
    };
    track.advance(band, &mut rng);
    track.advance(band, &mut rng);
    assert_eq!(track.remaining_days, 1);
    assert_eq!(track.modifier, -6.0);
    track.advance(band, &mut rng);
    assert!(!track.is_active());
    assert_eq!(track.modifier, 0.0);
}

#[test]
fn retired_players_are_skipped() {
    let mut rng = StdRng::seed_from_u64(8);
    let mut players = vec![player(1, 50), player(2, 50), player(3, 50)];
    players[1].retired = true;
    let advanced = advance_all(players.iter_mut(), &mut rng);
    assert_eq!(advanced, 2);
}

#[test]
fn strength_modifier_is_rounded_and_clamped() {
    let mut hot = player(1, 97);
    hot.form.short.modifier = 9.6;
    hot.form.short.remaining_days = 2;
    hot.form.long.modifier = 1.0;
    hot.form.long.remaining_days = 5;
    assert!((get_player_total_form_modifier(&hot) - 10.6).abs() < 1e-9);
    assert_eq!(apply_form_to_strength(97, &hot), 99);
    assert_eq!(hot.effective_attributes().strength, 99);
    // Only strength moves.
    assert_eq!(hot.effective_attributes().consistency, 50);

    let mut cold = player(2, 40);
    cold.form.medium.modifier = -6.6;
    cold.form.medium.remaining_days = 4;
    assert_eq!(apply_form_to_strength(40, &cold), 33);
}

#[test]
fn substitutes_have_zero_modifier() {
    assert_eq!(get_player_total_form_modifier(&EmergencySubstitute), 0.0);
    assert_eq!(apply_form_to_strength(50, &EmergencySubstitute), 50);
}

#[test]
fn every_base_strength_stays_in_range_at_band_extremes() {
    let extremes: [f64; 9] = [-22.0, -21.5, -10.0, -0.5, 0.0, 0.5, 10.0, 21.5, 22.0];
    for modifier in extremes {
        let mut p = player(1, 50);
        // Split the total across the three tracks without exceeding any band.
        let long = modifier.clamp(-5.0, 5.0);
        let medium = (modifier - long).clamp(-7.0, 7.0);
        let short = modifier - long - medium;
        p.form.short.modifier = short;
        p.form.short.remaining_days = 1;
        p.form.medium.modifier = medium;
        p.form.medium.remaining_days = 1;
        p.form.long.modifier = long;
        p.form.long.remaining_days = 1;
        assert!((get_player_total_form_modifier(&p) - modifier).abs() < 1e-9);

        for base in 1..=99u8 {
            let applied = apply_form_to_strength(base, &p);
            assert!((1..=99).contains(&applied), "base {base} modifier {modifier}: {applied}");
        }
    }
}
