// Copyright (C) 2025 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Line-delimited JSON output of records.

use crate::{pagination::Page, Result};
use std::io::{BufWriter, Write};

/// Write every record of every page as one compact JSON document per line.
///
/// Returns the number of records written. Writing stops at the first error
/// of the page sequence, which is returned once what precedes it is flushed.
pub fn write_pages<W, I>(writer: W, pages: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<Page>>,
{
    let mut writer = BufWriter::new(writer);
    let mut count = 0;
    for page in pages {
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                writer.flush()?;
                return Err(err);
            }
        };
        for record in &page {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        // one page may be all a consumer reads, show it right away
        writer.flush()?;
    }
    Ok(count)
}
