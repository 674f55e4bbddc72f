use crate::license::{License, LicenseLookup, UNKNOWN};
use crate::models::LicenseRisk;

/// One entry of the built-in license table.
#[derive(Debug)]
pub struct Definition {
    /// Canonical SPDX identifier.
    pub id: &'static str,
    /// Other names the license goes by in package metadata.
    pub aliases: &'static [&'static str],
    /// Ways to recognize the license in a file. Each entry is a set of
    /// normalized phrases that must all appear; any one set is enough.
    /// An empty list means the license is only ever resolved by name.
    pub markers: &'static [&'static [&'static str]],
    pub risk: LicenseRisk,
}

// Full license texts quote each other ("use the GNU Lesser General Public
// License instead", "GNU Affero General Public License, Version 3.0"), so the
// copyleft families are keyed on their contiguous title or notice phrase,
// never on loose words. Text matching still walks the table top to bottom:
// ISC is a superset of 0BSD and BSD-3-Clause of BSD-2-Clause.
const DEFINITIONS: &[Definition] = &[
    Definition {
        id: "AGPL-3.0",
        aliases: &["AGPL-3.0-only", "AGPL-3.0-or-later", "AGPL v3", "AGPLv3", "GNU AGPL v3"],
        markers: &[
            &["gnu affero general public license version 3"],
            &["gnu affero general public license as published by the free software foundation, either version 3"],
        ],
        risk: LicenseRisk::StrongCopyleft,
    },
    Definition {
        id: "LGPL-3.0",
        aliases: &["LGPL-3.0-only", "LGPL-3.0-or-later", "GNU LGPL v3", "LGPL v3", "LGPLv3"],
        markers: &[
            &["gnu lesser general public license version 3"],
            &["gnu lesser general public license as published by the free software foundation, either version 3"],
        ],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "LGPL-2.1",
        aliases: &["LGPL-2.1-only", "LGPL-2.1-or-later", "GNU LGPL v2.1", "LGPL v2.1", "LGPLv2.1"],
        markers: &[
            &["gnu lesser general public license version 2.1"],
            &["gnu lesser general public license as published by the free software foundation; either version 2.1"],
        ],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "LGPL-2.0",
        aliases: &["LGPL-2.0-only", "LGPL-2.0-or-later", "LGPLv2"],
        markers: &[
            &["gnu library general public license version 2"],
            &["gnu library general public license as published by the free software foundation; either version 2"],
        ],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "GPL-3.0",
        aliases: &[
            "GPL-3.0-only",
            "GPL-3.0-or-later",
            "GNU GPL v3",
            "GNU General Public License v3",
            "GPL v3",
            "GPLv3",
        ],
        markers: &[
            &["gnu general public license version 3"],
            &["gnu general public license as published by the free software foundation, either version 3"],
        ],
        risk: LicenseRisk::StrongCopyleft,
    },
    Definition {
        id: "GPL-2.0",
        aliases: &[
            "GPL-2.0-only",
            "GPL-2.0-or-later",
            "GNU GPL v2",
            "GNU General Public License v2",
            "GPL v2",
            "GPLv2",
        ],
        markers: &[
            &["gnu general public license version 2"],
            &["gnu general public license as published by the free software foundation; either version 2"],
        ],
        risk: LicenseRisk::StrongCopyleft,
    },
    Definition {
        id: "MPL-2.0",
        aliases: &["Mozilla Public License 2.0", "MPL 2.0", "MPLv2"],
        markers: &[
            &["mozilla public license version 2.0"],
            &["subject to the terms of the mozilla public license, v. 2.0"],
        ],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "EPL-2.0",
        aliases: &["Eclipse Public License 2.0", "Eclipse Public License - v 2.0"],
        markers: &[&["eclipse public license - v 2.0"]],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "EPL-1.0",
        aliases: &["Eclipse Public License 1.0", "Eclipse Public License - v 1.0"],
        markers: &[&["eclipse public license - v 1.0"]],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "CDDL-1.0",
        aliases: &["Common Development and Distribution License 1.0", "CDDL"],
        markers: &[&["common development and distribution license (cddl) version 1.0"]],
        risk: LicenseRisk::WeakCopyleft,
    },
    Definition {
        id: "Apache-2.0",
        aliases: &[
            "Apache 2.0",
            "Apache2",
            "Apache License 2.0",
            "Apache License, Version 2.0",
            "The Apache Software License, Version 2.0",
            "ASL 2.0",
        ],
        markers: &[
            &["apache license version 2.0"],
            &["licensed under the apache license, version 2.0"],
        ],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "MIT",
        aliases: &["MIT License", "The MIT License", "Expat", "License :: OSI Approved :: MIT License"],
        markers: &[&[
            "permission is hereby granted, free of charge",
            "the above copyright notice and this permission notice shall be included",
        ]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "ISC",
        aliases: &["ISC License", "License :: OSI Approved :: ISC License (ISCL)"],
        markers: &[&[
            "permission to use, copy, modify, and/or distribute this software for any purpose",
            "provided that the above copyright notice and this permission notice appear in all copies",
        ]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "0BSD",
        aliases: &["Zero-Clause BSD", "BSD Zero Clause License"],
        markers: &[&["permission to use, copy, modify, and/or distribute this software for any purpose"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "BSD-3-Clause",
        aliases: &[
            "BSD",
            "BSD License",
            "BSD 3-Clause",
            "New BSD",
            "Modified BSD",
            "License :: OSI Approved :: BSD License",
        ],
        markers: &[&[
            "redistribution and use in source and binary forms",
            "neither the name of",
        ]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "BSD-2-Clause",
        aliases: &["BSD 2-Clause", "Simplified BSD", "FreeBSD"],
        markers: &[&["redistribution and use in source and binary forms"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "BSL-1.0",
        aliases: &["Boost Software License 1.0", "Boost"],
        markers: &[&["boost software license - version 1.0"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "Unlicense",
        aliases: &["The Unlicense"],
        markers: &[&["this is free and unencumbered software released into the public domain"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "CC0-1.0",
        aliases: &["CC0", "Public Domain"],
        markers: &[&["cc0 1.0 universal"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "Zlib",
        aliases: &["zlib License", "zlib/libpng"],
        markers: &[&[
            "this software is provided 'as-is', without any express or implied warranty",
            "altered source versions must be plainly marked",
        ]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "WTFPL",
        aliases: &[],
        markers: &[&["do what the fuck you want to public license"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "Python-2.0",
        aliases: &["PSF", "PSF-2.0", "Python Software Foundation License"],
        markers: &[],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "Artistic-2.0",
        aliases: &["Artistic License 2.0"],
        markers: &[&["the artistic license 2.0"]],
        risk: LicenseRisk::Permissive,
    },
    Definition {
        id: "MIT-0",
        aliases: &["MIT No Attribution"],
        markers: &[],
        risk: LicenseRisk::Permissive,
    },
];

/// Find the table entry for a canonical license name.
pub fn definition(id: &str) -> Option<&'static Definition> {
    DEFINITIONS.iter().find(|d| d.id == id)
}

/// Lowercase `raw` and collapse runs of whitespace into single spaces.
fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The built-in license catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct Catalog;

impl Catalog {
    pub fn new() -> Self {
        Self
    }
}

impl LicenseLookup for Catalog {
    fn find_by_name(&self, name: Option<&str>) -> Option<License> {
        let Some(name) = name else {
            return Some(License::new(UNKNOWN));
        };

        let wanted = normalize(name.trim().trim_start_matches('(').trim_end_matches(')'));
        if wanted.is_empty() {
            return None;
        }

        DEFINITIONS
            .iter()
            .find(|d| {
                normalize(d.id) == wanted || d.aliases.iter().any(|a| normalize(a) == wanted)
            })
            .map(|d| License::new(d.id))
    }

    fn find_by_text(&self, text: &str) -> Option<License> {
        let haystack = normalize(text);
        DEFINITIONS
            .iter()
            .find(|d| {
                d.markers
                    .iter()
                    .any(|set| set.iter().all(|phrase| haystack.contains(phrase)))
            })
            .map(|d| License::new(d.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIT_TEXT: &str = "MIT License

Copyright (c) 2024 Someone

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the \"Software\"), to deal
in the Software without restriction.

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.";

    #[test]
    fn test_find_by_name_canonical_and_alias() {
        let catalog = Catalog::new();
        assert_eq!(catalog.find_by_name(Some("MIT")), Some(License::new("MIT")));
        assert_eq!(
            catalog.find_by_name(Some("Apache License, Version 2.0")),
            Some(License::new("Apache-2.0"))
        );
        assert_eq!(catalog.find_by_name(Some("  gplv3 ")), Some(License::new("GPL-3.0")));
        assert_eq!(catalog.find_by_name(Some("(MIT)")), Some(License::new("MIT")));
    }

    #[test]
    fn test_find_by_name_none_is_unknown() {
        let catalog = Catalog::new();
        let unknown = catalog.find_by_name(None).unwrap();
        assert!(unknown.is_unknown());
        assert_eq!(catalog.fallback(), unknown);
    }

    #[test]
    fn test_find_by_name_miss() {
        let catalog = Catalog::new();
        assert_eq!(catalog.find_by_name(Some("CUSTOM-LICENSE-42")), None);
        assert_eq!(catalog.find_by_name(Some("")), None);
    }

    #[test]
    fn test_find_by_text_mit() {
        assert_eq!(Catalog::new().find_by_text(MIT_TEXT), Some(License::new("MIT")));
    }

    #[test]
    fn test_find_by_text_prefers_lgpl_over_gpl() {
        let text = "GNU LESSER GENERAL PUBLIC LICENSE\n Version 3, 29 June 2007\n\
                    This version of the GNU Lesser General Public License incorporates\n\
                    the terms and conditions of version 3 of the GNU General Public License";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("LGPL-3.0")));
    }

    #[test]
    fn test_find_by_text_apache_header() {
        let text = "Licensed under the Apache License, Version 2.0 (the \"License\");";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("Apache-2.0")));
    }

    #[test]
    fn test_find_by_text_gpl3_full_text_is_not_lgpl() {
        let text = "                    GNU GENERAL PUBLIC LICENSE
                       Version 3, 29 June 2007

 Copyright (C) 2007 Free Software Foundation, Inc. <https://fsf.org/>
 Everyone is permitted to copy and distribute verbatim copies
 of this license document, but changing it is not allowed.

  The GNU General Public License does not permit incorporating your program
into proprietary programs.  If your program is a subroutine library, you
may consider it more useful to permit linking proprietary applications with
the library.  If this is what you want to do, use the GNU Lesser General
Public License instead of this License.  But first, please read
<https://www.gnu.org/licenses/why-not-lgpl.html>.";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("GPL-3.0")));
    }

    #[test]
    fn test_find_by_text_gpl2_full_text_is_not_lgpl() {
        let text = "                    GNU GENERAL PUBLIC LICENSE
                       Version 2, June 1991

 Copyright (C) 1989, 1991 Free Software Foundation, Inc.,
 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA

  When we speak of free software, we are referring to freedom, not
price.  (Some other Free Software Foundation software is covered by
the GNU Library General Public License instead.)  You can apply it to
your programs, too.";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("GPL-2.0")));
    }

    #[test]
    fn test_find_by_text_mpl2_secondary_licenses_are_ignored() {
        let text = "Mozilla Public License Version 2.0
==================================

1. Definitions
--------------

1.12. \"Secondary License\"
    means either the GNU General Public License, Version 2.0, the GNU
    Lesser General Public License, Version 2.1, the GNU Affero General
    Public License, Version 3.0, or any later versions of those
    licenses.";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("MPL-2.0")));
    }

    #[test]
    fn test_find_by_text_epl2_secondary_license_is_ignored() {
        let text = "Eclipse Public License - v 2.0

    THE ACCOMPANYING PROGRAM IS PROVIDED UNDER THE TERMS OF THIS ECLIPSE
    PUBLIC LICENSE (\"AGREEMENT\").

\"Secondary License\" means either the GNU General Public License,
Version 2.0, or any later versions of that license, including any
exceptions or additional permissions as identified by the initial
Contributor.";
        assert_eq!(Catalog::new().find_by_text(text), Some(License::new("EPL-2.0")));
    }

    #[test]
    fn test_find_by_text_source_file_notices() {
        let catalog = Catalog::new();
        let gpl3 = "This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.";
        assert_eq!(catalog.find_by_text(gpl3), Some(License::new("GPL-3.0")));

        let mpl = "This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.";
        assert_eq!(catalog.find_by_text(mpl), Some(License::new("MPL-2.0")));
    }

    #[test]
    fn test_find_by_text_no_match() {
        assert_eq!(Catalog::new().find_by_text("# my-crate\n\nA small library."), None);
    }

    #[test]
    fn test_every_definition_resolves_its_own_id() {
        let catalog = Catalog::new();
        for d in DEFINITIONS {
            assert_eq!(catalog.find_by_name(Some(d.id)), Some(License::new(d.id)));
        }
    }
}
