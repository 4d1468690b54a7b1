/*!
 * Subtitle marks transferred from a primary text to a translation on disk
 */

use anyhow::Result;
use stsync::errors::AlignmentError;
use stsync::file_utils::FileManager;
use stsync::split::AlignmentConfig;
use stsync::SubtitleSplitter;

use crate::common;

const PRIMARY: &str = "\
# The Journey

@It was a long road. @The travellers rested at every village on the way,
@and they slept under the open sky when no village could be found.

@At last they reached the sea. @Nobody spoke.

@The end.
";

fn marks(text: &str) -> usize {
    text.matches('@').count()
}

#[test]
fn test_split_filesWithMatchingParagraphs_shouldConserveMarks() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let primary_path = common::create_test_file(temp_dir.path(), "eng-0001.at", PRIMARY)?;
    let foreign_path = common::create_test_file(
        temp_dir.path(),
        "deu-0001.at",
        "\
# Die Reise

Es war ein langer Weg. Die Reisenden rasteten in jedem Dorf am Weg,
und sie schliefen unter freiem Himmel, wenn sich kein Dorf fand.

Endlich erreichten sie das Meer. Niemand sprach.

Das Ende.
",
    )?;
    let output_path = temp_dir.path().join("deu-0001.marked.at");

    let primary = FileManager::read_to_string(&primary_path)?;
    let foreign = FileManager::read_to_string(&foreign_path)?;
    let result = SubtitleSplitter::default().split(&primary, &foreign)?;
    FileManager::write_to_file(&output_path, &result.text)?;

    let written = FileManager::read_to_string(&output_path)?;
    assert_eq!(marks(&written), marks(PRIMARY));
    assert_eq!(result.confidences.len(), marks(PRIMARY));
    assert_eq!(written.replace('@', ""), foreign);
    assert!(written.contains("@Das Ende."));
    Ok(())
}

#[test]
fn test_split_fewerForeignParagraphs_shouldStillConserveMarks() -> Result<()> {
    let foreign = "\
# Die Reise

Es war ein langer Weg. Die Reisenden rasteten in jedem Dorf am Weg, und sie schliefen unter freiem Himmel, wenn sich kein Dorf fand. Endlich erreichten sie das Meer. Niemand sprach.

Das Ende.
";

    let result = SubtitleSplitter::default().split(PRIMARY, foreign)?;

    assert_eq!(marks(&result.text), marks(PRIMARY));
    assert_eq!(result.text.replace('@', ""), foreign);
    assert_eq!(result.confidences.len(), marks(PRIMARY));
    Ok(())
}

#[test]
fn test_split_moreForeignParagraphs_shouldStillConserveMarks() -> Result<()> {
    let primary = "@One short line. @Then another.\n\n@A closing sentence here.\n";
    let foreign = "Eine kurze Zeile.\n\nDann noch eine.\n\nEin abschließender Satz hier.\n";

    let result = SubtitleSplitter::default().split(primary, foreign)?;

    assert_eq!(marks(&result.text), 3);
    assert_eq!(result.text.replace('@', ""), foreign);
    Ok(())
}

#[test]
fn test_split_existingForeignMarks_shouldBeReplacedWhenRequested() -> Result<()> {
    let foreign = "@Es war ein @langer Weg.\n";

    let kept = SubtitleSplitter::default().split("@It was a long road.\n", foreign)?;
    let replaced = SubtitleSplitter::new('@', AlignmentConfig::default())
        .with_remove_existing_marks(true)
        .split("@It was a long road.\n", foreign)?;

    assert_eq!(marks(&kept.text), 3);
    assert_eq!(replaced.text, "@Es war ein langer Weg.\n");
    Ok(())
}

#[test]
fn test_split_blankForeignText_shouldFail() {
    let result = SubtitleSplitter::default().split(PRIMARY, "\n   \n");
    assert_eq!(result, Err(AlignmentError::EmptyForeignText { marks: marks(PRIMARY) }));
}

#[test]
fn test_split_unpairedPrimaryParagraph_shouldNotStackMarks() -> Result<()> {
    let primary = "@It was a long road through the hills and the valleys.\n\n@Silence.\n\n@At last they reached the sea after many days of walking.\n";
    let foreign = "Es war ein langer Weg durch die Hügel und die Täler.\n\nEndlich erreichten sie das Meer nach vielen Tagen zu Fuß.\n";

    let result = SubtitleSplitter::default().split(primary, foreign)?;

    assert_eq!(marks(&result.text), 3);
    assert!(!result.text.contains("@@"));
    assert_eq!(result.text.replace('@', ""), foreign);
    for (idx, _) in result.text.match_indices('@') {
        let before = result.text[..idx].chars().last();
        assert!(before.map_or(true, char::is_whitespace), "mark inside a word in {:?}", result.text);
    }
    Ok(())
}
