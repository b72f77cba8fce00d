use super::*;

#[test]
fn parses_commands_case_insensitively() {
    assert_eq!(Command::parse("   "), None);
    assert_eq!(Command::parse("Photos"), Some(Command::Photos));
    assert_eq!(Command::parse("DELETE-ALL"), Some(Command::DeleteAll));
    assert_eq!(
        Command::parse("movie horror"),
        Some(Command::Movie(Some(Genre::Horror)))
    );
    assert_eq!(Command::parse("movie"), Some(Command::Movie(None)));
    assert_eq!(Command::parse("movie romcom"), Some(Command::Movie(None)));
    assert_eq!(Command::parse("exit"), Some(Command::Quit));
}

#[test]
fn upload_keeps_path_with_spaces() {
    assert_eq!(
        Command::parse("upload  /tmp/our trip.png "),
        Some(Command::Upload(PathBuf::from("/tmp/our trip.png")))
    );
    assert_eq!(
        Command::parse("upload"),
        Some(Command::Unknown("upload".to_string()))
    );
}

#[test]
fn content_type_follows_extension() {
    assert_eq!(content_type_for(Path::new("a.JPG")), Some("image/jpeg"));
    assert_eq!(content_type_for(Path::new("dir/b.webp")), Some("image/webp"));
    assert_eq!(content_type_for(Path::new("notes.txt")), None);
    assert_eq!(content_type_for(Path::new("no_extension")), None);
}
