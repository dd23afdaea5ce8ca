//! BDD step definitions for countdown label parsing

use cucumber::{then, when};
use worldboss::eta::parse_eta_seconds;

use crate::world::WorldbossWorld;

#[when(expr = "the countdown label {string} is parsed")]
fn parse_label(world: &mut WorldbossWorld, label: String) {
    world.eta_result = Some(parse_eta_seconds(Some(&label)));
}

#[when("a missing countdown label is parsed")]
fn parse_missing(world: &mut WorldbossWorld) {
    world.eta_result = Some(parse_eta_seconds(None));
}

#[then(expr = "the ETA should be {int} seconds")]
fn eta_is(world: &mut WorldbossWorld, expected: u64) {
    let result = world.eta_result.expect("no label parsed");
    assert_eq!(result, Some(expected));
}

#[then("the ETA should be unknown")]
fn eta_unknown(world: &mut WorldbossWorld) {
    let result = world.eta_result.expect("no label parsed");
    assert_eq!(result, None);
}
