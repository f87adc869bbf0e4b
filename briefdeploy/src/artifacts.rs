//! Files that accompany the generated page in a newly created repository.
//!
//! Only written on round 1. Revisions replace `index.html` and leave these
//! untouched.

use chrono::Datelike;

use crate::types::{ArtifactFile, TaskId};

pub const INDEX_FILE: &str = "index.html";
pub const LICENSE_FILE: &str = "LICENSE";
pub const README_FILE: &str = "README.md";

pub fn index(html: &str) -> ArtifactFile {
    ArtifactFile::new(INDEX_FILE, html)
}

/// MIT license for `holder`, dated `year`.
pub fn license(year: i32, holder: &str) -> ArtifactFile {
    ArtifactFile::new(
        LICENSE_FILE,
        format!(
            r#"MIT License

Copyright (c) {year} {holder}

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"#
        ),
    )
}

pub fn readme(task: &TaskId) -> ArtifactFile {
    ArtifactFile::new(
        README_FILE,
        format!(
            "# LLM Generated App: {task}\n\
             \n\
             ## Summary\n\
             This application was automatically generated by an LLM based on the project brief.\n\
             \n\
             ## Setup & Usage\n\
             This is a single-page web application hosted on GitHub Pages.\n\
             \n\
             ## License\n\
             This project is released under the MIT License (see LICENSE file).\n"
        ),
    )
}

/// The full file set for a new repository, licensed in the current year.
pub fn initial_files(html: &str, task: &TaskId, holder: &str) -> Vec<ArtifactFile> {
    let year = chrono::Utc::now().year();
    vec![index(html), license(year, holder), readme(task)]
}
