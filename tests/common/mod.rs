//! Shared model builders for fm-merge integration tests.
//!
//! The two `Car` models share only their root:
//!
//! - [`car_a`]: 5 optional extras × engine (3) × transmission (3) = 288
//! - [`car_b`]: 2 optional extras × 4 alternatives of 3 = 324

#![allow(dead_code)]

use fm_oracle::{DpllOracle, Oracle};
use fmmerge::compile;
use fmmerge::model::{Model, Region};

pub fn car_a() -> Model {
    car_a_in(Region::A)
}

pub fn car_a_in(region: Region) -> Model {
    let mut m = Model::with_root(region, "Car");
    for extra in ["Sunroof", "Radio", "Gps", "HeatedSeats", "Alarm"] {
        m.optional("Car", extra).unwrap();
    }
    m.mandatory("Car", "Engine").unwrap();
    m.alternative("Engine", &["Petrol", "Diesel", "Electric"])
        .unwrap();
    m.mandatory("Car", "Transmission").unwrap();
    m.alternative("Transmission", &["Manual", "Automatic", "Cvt"])
        .unwrap();
    m
}

pub fn car_b() -> Model {
    car_b_in(Region::B)
}

pub fn car_b_in(region: Region) -> Model {
    let mut m = Model::with_root(region, "Car");
    for extra in ["Towbar", "RoofRack"] {
        m.optional("Car", extra).unwrap();
    }
    for (parent, options) in [
        ("Color", ["Red", "Blue", "Black"]),
        ("Wheels", ["Steel", "Alloy", "Chrome"]),
        ("Interior", ["Cloth", "Leather", "Vinyl"]),
        ("Trim", ["Base", "Sport", "Luxury"]),
    ] {
        m.mandatory("Car", parent).unwrap();
        m.alternative(parent, &options).unwrap();
    }
    m
}

/// A small model: root plus optional children.
pub fn simple(region: Region, root: &str, optional: &[&str]) -> Model {
    let mut m = Model::with_root(region, root);
    for f in optional {
        m.optional(root, f).unwrap();
    }
    m
}

pub fn count(model: &Model) -> u64 {
    DpllOracle::new()
        .count_solutions(&compile(model).unwrap())
        .unwrap()
}
