use geowar_server::error::GameError;
use geowar_server::geo::{self, GeoBounds, GeoPoint};
use geowar_server::join_code::{JoinCodeGenerator, DEFAULT_CODE_LENGTH, MAX_ATTEMPTS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

const MILAN: GeoPoint = GeoPoint::new(45.4641, 9.1919);

#[test]
fn random_points_stay_inside_the_radius() {
    let mut rng = StdRng::seed_from_u64(7);
    for radius in [0.5, 5.0, 30.0, 250.0] {
        for _ in 0..2_000 {
            let point = geo::random_point_in_radius(&mut rng, &MILAN, radius);
            assert!(point.is_valid());
            let distance = MILAN.distance_km(&point);
            assert!(
                distance <= radius + 1e-6,
                "{distance} km exceeds radius {radius} km"
            );
        }
    }
}

#[test]
fn random_points_are_not_crowded_at_the_center() {
    let mut rng = StdRng::seed_from_u64(42);
    let radius = 10.0;
    let samples = 20_000;
    let inner = (0..samples)
        .map(|_| geo::random_point_in_radius(&mut rng, &MILAN, radius))
        .filter(|p| MILAN.distance_km(p) <= radius / 2.0)
        .count();
    // the inner half-radius disk holds a quarter of the area
    let share = inner as f64 / samples as f64;
    assert!((0.22..0.28).contains(&share), "inner share was {share}");
}

#[test]
fn random_points_near_the_antimeridian_wrap() {
    let mut rng = StdRng::seed_from_u64(3);
    let center = GeoPoint::new(-17.7, 179.95);
    for _ in 0..1_000 {
        let point = geo::random_point_in_radius(&mut rng, &center, 40.0);
        assert!(point.is_valid());
        assert!(center.distance_km(&point) <= 40.0 + 1e-6);
    }
}

#[test]
fn scattered_points_stay_in_bounds() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5_000 {
        let point = geo::random_point_in_bounds(&mut rng, &GeoBounds::ITALY);
        assert!(GeoBounds::ITALY.contains(&point));
    }
}

#[test]
fn bounds_validation() {
    assert!(GeoBounds::ITALY.is_valid());
    let inverted = GeoBounds {
        min_lat: 10.0,
        max_lat: 5.0,
        min_lon: 0.0,
        max_lon: 1.0,
    };
    assert!(!inverted.is_valid());
    let off_globe = GeoBounds {
        min_lat: 0.0,
        max_lat: 95.0,
        min_lon: 0.0,
        max_lon: 1.0,
    };
    assert!(!off_globe.is_valid());
}

#[test]
fn destination_matches_distance() {
    for (i, km) in [0.08, 0.25, 3.0, 120.0].into_iter().enumerate() {
        let bearing = i as f64 * 1.3;
        let point = MILAN.destination(km, bearing);
        assert!((MILAN.distance_km(&point) - km).abs() < 1e-6);
    }
    let north = MILAN.destination(10.0, 0.0);
    assert!(north.lat > MILAN.lat);
    assert!((north.lon - MILAN.lon).abs() < 1e-9);
}

#[test]
fn positions_off_the_globe_are_invalid() {
    assert!(GeoPoint::new(0.0, 0.0).is_valid());
    assert!(!GeoPoint::new(90.5, 0.0).is_valid());
    assert!(!GeoPoint::new(0.0, -180.5).is_valid());
    assert!(!GeoPoint::new(f64::INFINITY, 0.0).is_valid());
}

#[test]
fn generated_codes_never_repeat_with_a_tiny_alphabet() {
    let generator = JoinCodeGenerator::new(b"AB", 14).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let mut issued = HashSet::new();
    for _ in 0..10_000 {
        let code = generator
            .generate(&mut rng, |code| issued.contains(code))
            .unwrap();
        assert_eq!(code.len(), generator.length());
        assert!(code.bytes().all(|c| c == b'A' || c == b'B'));
        assert!(issued.insert(code));
    }
}

#[test]
fn generation_gives_up_when_every_code_is_taken() {
    let generator = JoinCodeGenerator::new(b"Z", 3).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let err = generator.generate(&mut rng, |_| true).unwrap_err();
    assert!(matches!(err, GameError::JoinCodeExhausted(MAX_ATTEMPTS)));
    assert!(generator.generate(&mut rng, |_| false).is_ok());
}

#[test]
fn codes_are_normalized() {
    let generator = JoinCodeGenerator::with_length(DEFAULT_CODE_LENGTH).unwrap();
    assert_eq!(generator.normalize(" ab12cd ").unwrap(), "AB12CD");
    assert!(generator.normalize("AB12C").is_err());
    assert!(generator.normalize("AB12C!").is_err());
    assert!(JoinCodeGenerator::new(b"ab", 4).is_err());
    assert!(JoinCodeGenerator::new(b"", 4).is_err());
}
