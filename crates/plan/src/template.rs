// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Markdown template showing the expected plan format.
pub fn template() -> &'static str {
    r#"# Implementation Plan Title

**Goal:** One sentence description of the objective

---

## Task Groups

| Task Group | Tasks | Rationale |
|------------|-------|-----------|
| Group 1    | models, schema | Core infrastructure (parallel) |
| Group 2    | endpoints      | Feature (depends on Group 1)   |
| Group 3    | tests          | Verification (depends on Group 2) |

Tasks in Group N depend on ALL tasks in Group N-1; tasks within the same
group are independent and may run in parallel.

---

### Task models: Create the data model

Detailed instructions for the worker picking up this task.

### Task schema: Define the storage schema

Instructions may span multiple paragraphs and include code fences.

### Task endpoints: Implement the API endpoints

Depends on everything in Group 1.

### Task tests: Integration tests

Cover the full flow end to end.
"#
}
