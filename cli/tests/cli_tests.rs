#[test]
fn append() {
    trycmd::TestCases::new()
        .case("tests/append/*.toml")
        .default_bin_name("npy");
}

#[test]
fn cosine() {
    trycmd::TestCases::new()
        .case("tests/cosine/*.toml")
        .default_bin_name("npy");
}

#[test]
fn header() {
    trycmd::TestCases::new()
        .case("tests/header/*.toml")
        .default_bin_name("npy");
}

#[test]
fn view() {
    trycmd::TestCases::new()
        .case("tests/view/*.toml")
        .default_bin_name("npy");
}
