//! License text classifier
//!
//! Identifies a license from raw text by checking which canonical clauses of
//! each known license appear in it. The confidence for a license is the
//! fraction of its clauses present. Used when a remote source returns a
//! license file it could not classify itself.

use super::{spdx, License};
use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum confidence a detected license must exceed to be reported.
pub const DETECTION_THRESHOLD: f64 = 0.90;

/// Canonical clause snippets per license. Snippets are normalized the same
/// way as the input before matching, so punctuation and case are irrelevant.
const CORPUS: &[(&str, &[&str])] = &[
    (
        "MIT",
        &[
            "permission is hereby granted, free of charge, to any person obtaining a copy",
            "to deal in the software without restriction",
            "the above copyright notice and this permission notice shall be included in all copies or substantial portions of the software",
            "the software is provided \"as is\", without warranty of any kind",
        ],
    ),
    (
        "ISC",
        &[
            "permission to use, copy, modify, and/or distribute this software for any purpose with or without fee is hereby granted",
            "provided that the above copyright notice and this permission notice appear in all copies",
            "the software is provided \"as is\" and the author disclaims all warranties with regard to this software",
        ],
    ),
    (
        "BSD-2-Clause",
        &[
            "redistribution and use in source and binary forms, with or without modification, are permitted provided that the following conditions are met",
            "redistributions of source code must retain the above copyright notice",
            "redistributions in binary form must reproduce the above copyright notice",
            "and any express or implied warranties, including, but not limited to, the implied warranties of merchantability",
        ],
    ),
    (
        "BSD-3-Clause",
        &[
            "redistribution and use in source and binary forms, with or without modification, are permitted provided that the following conditions are met",
            "redistributions of source code must retain the above copyright notice",
            "redistributions in binary form must reproduce the above copyright notice",
            "and any express or implied warranties, including, but not limited to, the implied warranties of merchantability",
            "neither the name of",
            "may be used to endorse or promote products derived from this software without specific prior written permission",
        ],
    ),
    (
        "Apache-2.0",
        &[
            "apache license",
            "version 2.0",
            "perpetual, worldwide, non-exclusive, no-charge, royalty-free, irrevocable copyright license",
            "grant of patent license",
            "you must cause any modified files to carry prominent notices stating that you changed the files",
            "trade names, trademarks, service marks",
        ],
    ),
    (
        "MPL-2.0",
        &[
            "mozilla public license, version 2.0",
            "\"covered software\" means",
            "\"larger work\" means",
            "\"secondary license\" means",
        ],
    ),
    (
        "GPL-2.0",
        &[
            "gnu general public license",
            "version 2, june 1991",
            "you may copy and distribute verbatim copies of the program's source code",
            "the precise terms and conditions for copying, distribution and modification follow",
        ],
    ),
    (
        "GPL-3.0",
        &[
            "gnu general public license",
            "version 3, 29 june 2007",
            "the precise terms and conditions for copying, distribution and modification follow",
            "corresponding source",
            "installation information",
        ],
    ),
    (
        "LGPL-2.1",
        &[
            "gnu lesser general public license",
            "version 2.1, february 1999",
            "work that uses the library",
        ],
    ),
    (
        "LGPL-3.0",
        &[
            "gnu lesser general public license",
            "version 3, 29 june 2007",
            "incorporates the terms and conditions of version 3 of the gnu general public license",
        ],
    ),
    (
        "AGPL-3.0",
        &[
            "gnu affero general public license",
            "version 3, 19 november 2007",
            "remote network interaction",
            "corresponding source",
            "installation information",
        ],
    ),
    (
        "Unlicense",
        &[
            "this is free and unencumbered software released into the public domain",
            "anyone is free to copy, modify, publish, use, compile, sell, or distribute this software",
            "unlicense.org",
        ],
    ),
    (
        "Zlib",
        &[
            "this software is provided 'as-is', without any express or implied warranty",
            "the origin of this software must not be misrepresented",
            "altered source versions must be plainly marked as such",
            "this notice may not be removed or altered from any source distribution",
        ],
    ),
];

/// Best match for a piece of license text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub spdx_id: String,
    /// Fraction of the license's canonical clauses found, 0.0 - 1.0
    pub confidence: f64,
    /// Clauses that were found
    pub evidence: Vec<String>,
    /// Other candidates with non-zero confidence, best first
    pub alternatives: Vec<(String, f64)>,
}

/// Clause-matching license classifier over the built-in corpus.
pub struct LicenseClassifier {
    matcher: AhoCorasick,
    /// Distinct normalized clauses, indexed by matcher pattern id
    clauses: Vec<String>,
    /// Per corpus entry: indices into `clauses`
    license_clauses: Vec<Vec<usize>>,
}

impl LicenseClassifier {
    pub fn new() -> Self {
        let mut clauses: Vec<String> = Vec::new();
        let mut license_clauses = Vec::with_capacity(CORPUS.len());

        for (_, snippets) in CORPUS {
            let mut indices = Vec::with_capacity(snippets.len());
            for snippet in *snippets {
                let normalized = normalize(snippet);
                let idx = match clauses.iter().position(|c| *c == normalized) {
                    Some(idx) => idx,
                    None => {
                        clauses.push(normalized);
                        clauses.len() - 1
                    }
                };
                indices.push(idx);
            }
            license_clauses.push(indices);
        }

        let matcher = AhoCorasick::new(&clauses).expect("Failed to build clause matcher");

        Self {
            matcher,
            clauses,
            license_clauses,
        }
    }

    /// Score `text` against every known license and return the best
    /// candidate, regardless of confidence.
    pub fn classify(&self, text: &str) -> Option<Classification> {
        let normalized = normalize(text);
        let found: HashSet<usize> = self
            .matcher
            .find_overlapping_iter(&normalized)
            .map(|m| m.pattern().as_usize())
            .collect();

        if found.is_empty() {
            return None;
        }

        // (corpus idx, confidence, clause count)
        let mut scored: Vec<(usize, f64, usize)> = self
            .license_clauses
            .iter()
            .enumerate()
            .map(|(li, indices)| {
                let hits = indices.iter().filter(|i| found.contains(i)).count();
                (li, hits as f64 / indices.len() as f64, indices.len())
            })
            .filter(|(_, confidence, _)| *confidence > 0.0)
            .collect();

        // Highest confidence first; on a tie the more specific license wins
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.2.cmp(&a.2)));

        let (best_idx, confidence, _) = *scored.first()?;
        let evidence = self.license_clauses[best_idx]
            .iter()
            .filter(|i| found.contains(i))
            .map(|&i| self.clauses[i].clone())
            .collect();

        Some(Classification {
            spdx_id: CORPUS[best_idx].0.to_string(),
            confidence,
            evidence,
            alternatives: scored
                .iter()
                .skip(1)
                .map(|&(li, c, _)| (CORPUS[li].0.to_string(), c))
                .collect(),
        })
    }

    /// Detect the license in `text`, accepting only matches above
    /// [`DETECTION_THRESHOLD`].
    pub fn detect(&self, text: &str) -> Option<License> {
        let best = self.classify(text)?;
        if best.confidence <= DETECTION_THRESHOLD {
            tracing::debug!(
                "best license match {} at {:.2} is below threshold",
                best.spdx_id,
                best.confidence
            );
            return None;
        }

        Some(spdx::lookup(&best.spdx_id).unwrap_or_else(|| License::new("", best.spdx_id)))
    }
}

impl Default for LicenseClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, drop punctuation, collapse whitespace.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIT: &str = r#"MIT License

Copyright (c) 2024 Example Corp

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
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT."#;

    const BSD3: &str = r#"Copyright (c) 2009 The Go Authors. All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are
met:

   * Redistributions of source code must retain the above copyright
notice, this list of conditions and the following disclaimer.
   * Redistributions in binary form must reproduce the above
copyright notice, this list of conditions and the following disclaimer
in the documentation and/or other materials provided with the
distribution.
   * Neither the name of Google Inc. nor the names of its
contributors may be used to endorse or promote products derived from
this software without specific prior written permission.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
"AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
A PARTICULAR PURPOSE ARE DISCLAIMED."#;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  THE Software is \"AS IS\",\n  without"), "the software is as is without");
    }

    #[test]
    fn test_detect_mit() {
        let classifier = LicenseClassifier::new();
        let best = classifier.classify(MIT).unwrap();
        assert_eq!(best.spdx_id, "MIT");
        assert!((best.confidence - 1.0).abs() < f64::EPSILON);

        let lic = classifier.detect(MIT).unwrap();
        assert_eq!(lic.spdx_id(), "MIT");
        assert_eq!(lic.name(), "MIT License");
    }

    #[test]
    fn test_bsd3_beats_bsd2_on_tie() {
        let classifier = LicenseClassifier::new();
        let best = classifier.classify(BSD3).unwrap();
        assert_eq!(best.spdx_id, "BSD-3-Clause");
        assert!(best
            .alternatives
            .iter()
            .any(|(id, c)| id == "BSD-2-Clause" && (*c - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_partial_text_below_threshold() {
        let stripped = "Permission is hereby granted, free of charge, to any person obtaining a copy \
                        of this software. THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND.";
        let classifier = LicenseClassifier::new();
        let best = classifier.classify(stripped).unwrap();
        assert_eq!(best.spdx_id, "MIT");
        assert!(best.confidence <= DETECTION_THRESHOLD);
        assert!(classifier.detect(stripped).is_none());
    }

    #[test]
    fn test_unrelated_text() {
        let classifier = LicenseClassifier::new();
        assert!(classifier.classify("All rights reserved. Do not copy.").is_none());
        assert!(classifier.detect("").is_none());
    }
}
