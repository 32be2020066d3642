use ragstore_core::config::{DenseProvider, Pooling, Settings};
use ragstore_core::Error;

#[test]
fn empty_config_yields_defaults() {
    let settings = Settings::from_toml_str("").expect("defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.search.top_k, 3);
    assert_eq!(settings.search.rrf_k, 60.0);
    assert_eq!(settings.ingest.batch_size, 1000);
    assert_eq!(settings.dense.provider, DenseProvider::BgeM3);
    assert_eq!(settings.dense.pooling, Pooling::Cls);
}

#[test]
fn partial_sections_override_only_named_keys() {
    let settings = Settings::from_toml_str(
        r#"
        [dense]
        provider = "hashing"
        dim = 8

        [search]
        over_fetch = 2
        "#,
    )
    .expect("parse");
    assert_eq!(settings.dense.provider, DenseProvider::Hashing);
    assert_eq!(settings.dense.dim, 8);
    assert_eq!(settings.search.over_fetch, 2);
    assert_eq!(settings.search.top_k, 3);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Settings::from_toml_str("[search]\ntopk = 5\n").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");

    let err = Settings::from_toml_str("[retriever]\nk = 5\n").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn out_of_range_values_are_rejected() {
    for toml in [
        "[ingest]\nbatch_size = 0\n",
        "[ingest]\nchunk_size = 100\noverlap = 101\n",
        "[search]\ntop_k = 0\n",
        "[search]\nrrf_k = 0.0\n",
        "[sparse]\nb = 1.5\n",
    ] {
        assert!(matches!(Settings::from_toml_str(toml), Err(Error::InvalidConfig(_))), "accepted: {toml}");
    }
}

#[test]
fn overlap_may_equal_chunk_size() {
    let settings = Settings::from_toml_str("[ingest]\nchunk_size = 100\noverlap = 100\n").unwrap();
    assert_eq!(settings.ingest.overlap, 100);
}

#[test]
fn unknown_environment_name_is_rejected() {
    assert!(matches!(Settings::load_for_env("staging"), Err(Error::InvalidConfig(_))));
}
