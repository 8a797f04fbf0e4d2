// Unit tests for signed paths through the public API

use pixvariant::signing::{
    canonical_string, sign, sign_at, split_path_and_query, verify, verify_at, QueryPairs,
    SignOptions,
};

#[test]
fn test_signed_path_verifies_with_same_secret_only() {
    let signed = sign("/img/cat.jpg?w=400&format=webp", "alpha", SignOptions::default());

    assert!(verify(&signed, "alpha"));
    assert!(!verify(&signed, "beta"));
}

#[test]
fn test_any_mutation_breaks_the_signature() {
    let signed = sign("/img/cat.jpg?w=400&q=80", "alpha", SignOptions::default());

    let mutations = [
        signed.replace("w=400", "w=401"),
        signed.replace("q=80", "q=81"),
        signed.replace("/img/cat.jpg", "/img/dog.jpg"),
        format!("{}&h=10", signed),
        signed.replace("&q=80", ""),
    ];
    for mutated in &mutations {
        assert!(!verify(mutated, "alpha"), "mutation verified: {}", mutated);
    }

    // Flip one character of the signature itself
    let (prefix, signature) = signed.rsplit_once("s=").unwrap();
    let mut chars: Vec<char> = signature.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    let forged = format!("{}s={}", prefix, chars.into_iter().collect::<String>());
    assert!(!verify(&forged, "alpha"));
}

#[test]
fn test_expiring_signature_lifecycle() {
    // Test: a 1 second lifetime is valid at signing time and invalid after it
    let now = 1_800_000_000;
    let signed = sign_at("/img/cat.jpg?w=400", "alpha", SignOptions::expires_in(1), now);

    assert!(signed.contains("e=1800000001"));
    assert!(verify_at(&signed, "alpha", now));
    assert!(verify_at(&signed, "alpha", now + 1));
    assert!(!verify_at(&signed, "alpha", now + 2));
}

#[test]
fn test_signed_absolute_url_verifies_as_path() {
    let signed = sign(
        "https://images.example.com/img/cat.jpg?w=400#hero",
        "alpha",
        SignOptions::default(),
    );

    assert!(signed.starts_with("/img/cat.jpg?w=400&s="));
    assert!(!signed.contains('#'));
    assert!(verify(&signed, "alpha"));
}

#[test]
fn test_canonical_string_keeps_raw_segments_in_order() {
    let (path, query) = split_path_and_query("/img/a.jpg?w=1&b&c=3");
    let pairs = QueryPairs::parse(query);

    assert_eq!(path, "/img/a.jpg");
    assert_eq!(canonical_string(path, &pairs), "/img/a.jpg?w=1&b=&c=3");
    assert_eq!(canonical_string(path, &QueryPairs::parse("")), "/img/a.jpg");
}
