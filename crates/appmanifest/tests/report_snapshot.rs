use std::path::Path;

use appmanifest::ApplicationNameLocator;
use appmanifest::app::report::{LocatedManifest, OutputFormat, Report, Reporter};
use insta::assert_snapshot;

#[test]
fn json_report_for_root_level_manifest() {
    let manifest = LocatedManifest::from_text(
        Path::new("manifest.yml"),
        "manifest.yml",
        "name: demo\nmemory: 256M\n",
        &ApplicationNameLocator::new(),
        None,
    );
    let report = Report::build(&[manifest], false);
    let rendered = Reporter::new()
        .expect("reporter")
        .render(&report, OutputFormat::Json)
        .expect("render json");

    assert_snapshot!(rendered, @r#"
    {
      "manifests": [
        {
          "path": "manifest.yml",
          "applications": [
            {
              "name": "demo",
              "selected": true,
              "root_level": true,
              "span": {
                "start": 0,
                "end": 24
              },
              "start": {
                "line": 1,
                "column": 1
              },
              "end": {
                "line": 3,
                "column": 1
              }
            }
          ]
        }
      ]
    }
    "#);
}
