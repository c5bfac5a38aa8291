//! Document skeletons for numbered assignment folders.
//!
//! Each `H{nn}` folder gets `H{nn}/Tex/H{nn}.tex` and `P{nn}/Tex/P{nn}.tex`
//! rendered from a template; coding sheets also get an empty `Code-H{nn}`.
//! Directories are created only when missing, documents are rewritten on
//! every run.

use std::fs;
use std::path::{Path, PathBuf};

use super::numbering::AssignmentNumber;
use super::{ensure_dir, SyncError};
use crate::config::StudentInfo;
use crate::domain::CourseSpec;
use crate::paths;

/// Default LaTeX skeleton. Placeholders: `{{course}}`, `{{number}}`,
/// `{{label}}`, `{{student_name}}`, `{{student_id}}`.
pub const DEFAULT_TEMPLATE: &str = r"\documentclass[a4paper,11pt]{article}
\usepackage[utf8]{inputenc}
\usepackage[T1]{fontenc}
\usepackage[ngerman]{babel}
\usepackage{amsmath,amssymb,amsthm}
\usepackage{enumitem}
\usepackage{fancyhdr}
\usepackage[margin=2.5cm]{geometry}

\pagestyle{fancy}
\fancyhf{}
\lhead{{{course}}}
\chead{Blatt {{number}}}
\rhead{{{student_name}} ({{student_id}})}
\cfoot{\thepage}

\title{{{course}} -- {{label}}}
\author{{{student_name}} \\ Matrikelnummer: {{student_id}}}
\date{}

\begin{document}
\maketitle

\section*{Aufgabe 1}

\section*{Aufgabe 2}

\section*{Aufgabe 3}

\end{document}
";

/// Values substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields<'a> {
    pub course: &'a str,
    pub number: &'a AssignmentNumber,
    /// `H07` or `P07`
    pub label: &'a str,
    pub student_name: &'a str,
    pub student_id: &'a str,
}

/// Escape characters that carry meaning in LaTeX.
pub fn escape_latex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a document. Pure: same fields, same output.
pub fn render_document(template: &str, fields: &DocumentFields<'_>) -> String {
    [
        ("{{course}}", escape_latex(fields.course)),
        ("{{number}}", fields.number.to_string()),
        ("{{label}}", escape_latex(fields.label)),
        ("{{student_name}}", escape_latex(fields.student_name)),
        ("{{student_id}}", escape_latex(fields.student_id)),
    ]
    .iter()
    .fold(template.to_string(), |doc, (marker, value)| {
        doc.replace(marker, value)
    })
}

/// Outcome of a seeding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// `H{nn}` folders seeded
    pub folders: Vec<String>,
    pub documents: Vec<PathBuf>,
    pub code_folders: Vec<PathBuf>,
    /// (folder, error) pairs
    pub failures: Vec<(String, String)>,
}

/// Seeds every `H{nn}` folder of one course.
#[derive(Debug, Clone)]
pub struct Seeder<'a> {
    course: &'a CourseSpec,
    student: &'a StudentInfo,
    template: &'a str,
}

impl<'a> Seeder<'a> {
    pub fn new(course: &'a CourseSpec, student: &'a StudentInfo, template: &'a str) -> Self {
        Self {
            course,
            student,
            template,
        }
    }

    /// Seed all folders named exactly `H` + two digits under the course folder.
    pub fn seed(&self) -> Result<SeedReport, SyncError> {
        let course_dir = self.course.local_folder.as_path();
        let entries = fs::read_dir(course_dir).map_err(|e| SyncError::io(course_dir, e))?;

        let mut numbers: Vec<AssignmentNumber> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().and_then(paths::parse_destination_folder))
            .collect();
        numbers.sort();

        let mut report = SeedReport::default();
        for number in numbers {
            let label = paths::primary_label(&number);
            match self.seed_folder(course_dir, &number, &mut report) {
                Ok(()) => report.folders.push(label),
                Err(e) => {
                    tracing::warn!("Failed to seed {}: {}", label, e);
                    report.failures.push((label, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    fn seed_folder(
        &self,
        course_dir: &Path,
        number: &AssignmentNumber,
        report: &mut SeedReport,
    ) -> Result<(), SyncError> {
        let documents = [
            (paths::primary_label(number), paths::primary_document(course_dir, number)),
            (paths::practice_label(number), paths::practice_document(course_dir, number)),
        ];

        for (label, path) in documents {
            if let Some(tex_dir) = path.parent() {
                ensure_dir(tex_dir)?;
            }
            let fields = DocumentFields {
                course: &self.course.name,
                number,
                label: &label,
                student_name: &self.student.name,
                student_id: &self.student.id,
            };
            fs::write(&path, render_document(self.template, &fields))
                .map_err(|e| SyncError::io(&path, e))?;
            tracing::debug!("Wrote {}", path.display());
            report.documents.push(path);
        }

        if self.course.category.has_code_folder() {
            let code_dir = paths::code_dir(course_dir, number);
            if ensure_dir(&code_dir)? {
                tracing::info!("Created {}", code_dir.display());
            }
            report.code_folders.push(code_dir);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use tempfile::TempDir;

    fn student() -> StudentInfo {
        StudentInfo {
            name: "Erika Mustermann".to_string(),
            id: "1234567".to_string(),
        }
    }

    fn course(dir: &Path, category: Category) -> CourseSpec {
        CourseSpec {
            id: "3889792".to_string(),
            category,
            local_folder: dir.to_path_buf(),
            name: "Theo 1".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_fields() {
        let number = AssignmentNumber::from_digits("5").unwrap();
        let doc = render_document(
            DEFAULT_TEMPLATE,
            &DocumentFields {
                course: "Theo 1",
                number: &number,
                label: "H05",
                student_name: "Erika Mustermann",
                student_id: "1234567",
            },
        );

        assert!(doc.contains(r"\lhead{Theo 1}"));
        assert!(doc.contains(r"\chead{Blatt 05}"));
        assert!(doc.contains(r"\title{Theo 1 -- H05}"));
        assert!(doc.contains("Erika Mustermann"));
        assert!(doc.contains("1234567"));
        assert!(!doc.contains("{{"));
    }

    #[test]
    fn test_render_escapes_latex() {
        let number = AssignmentNumber::from_digits("1").unwrap();
        let doc = render_document(
            "{{course}}|{{student_name}}",
            &DocumentFields {
                course: "Theo_1 & 100%",
                number: &number,
                label: "H01",
                student_name: "A {B}",
                student_id: "1",
            },
        );
        assert_eq!(doc, r"Theo\_1 \& 100\%|A \{B\}");
    }

    #[test]
    fn test_escape_latex_specials() {
        assert_eq!(escape_latex(r"a\b"), r"a\textbackslash{}b");
        assert_eq!(escape_latex("x^2~y"), r"x\textasciicircum{}2\textasciitilde{}y");
        assert_eq!(escape_latex("#$"), r"\#\$");
    }

    #[test]
    fn test_seed_creates_skeleton() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("H05")).unwrap();
        let course = course(temp.path(), Category::Sheet);
        let student = student();

        let report = Seeder::new(&course, &student, DEFAULT_TEMPLATE).seed().unwrap();

        let primary = temp.path().join("H05/H05/Tex/H05.tex");
        let practice = temp.path().join("H05/P05/Tex/P05.tex");
        assert_eq!(report.folders, vec!["H05"]);
        assert_eq!(report.documents, vec![primary.clone(), practice.clone()]);
        assert!(report.code_folders.is_empty());

        let content = fs::read_to_string(&primary).unwrap();
        assert!(content.contains("Theo 1"));
        assert!(content.contains("05"));
        assert!(content.contains("Erika Mustermann"));
        assert!(content.contains("1234567"));
        assert!(fs::read_to_string(&practice).unwrap().contains("P05"));
        assert!(!temp.path().join("H05/Code-H05").exists());
    }

    #[test]
    fn test_seed_overwrites_documents() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("H01")).unwrap();
        let course = course(temp.path(), Category::Sheet);
        let student = student();
        let seeder = Seeder::new(&course, &student, DEFAULT_TEMPLATE);

        seeder.seed().unwrap();
        let primary = temp.path().join("H01/H01/Tex/H01.tex");
        fs::write(&primary, "manual edits").unwrap();

        seeder.seed().unwrap();
        assert_ne!(fs::read_to_string(&primary).unwrap(), "manual edits");
    }

    #[test]
    fn test_seed_coding_sheet_adds_code_folder() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("H02")).unwrap();
        let course = course(temp.path(), Category::CodingSheet);
        let student = student();

        let report = Seeder::new(&course, &student, DEFAULT_TEMPLATE).seed().unwrap();

        let code_dir = temp.path().join("H02/Code-H02");
        assert!(code_dir.is_dir());
        assert_eq!(report.code_folders, vec![code_dir.clone()]);
        assert_eq!(fs::read_dir(&code_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_seed_ignores_other_folders() {
        let temp = TempDir::new().unwrap();
        for name in ["H1", "H100", "P01", "Vorlesung"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }
        fs::write(temp.path().join("H03"), "a file, not a folder").unwrap();
        let course = course(temp.path(), Category::Sheet);
        let student = student();

        let report = Seeder::new(&course, &student, DEFAULT_TEMPLATE).seed().unwrap();
        assert_eq!(report, SeedReport::default());
    }
}
