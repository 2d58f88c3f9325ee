use crate::solver::SheetLayout;
use crate::types::SheetSpec;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// ASCII preview of one nested sheet, placements labelled by panel id.
pub fn render_sheet(sheet: &SheetSpec, layout: &SheetLayout) -> String {
    let scale = f64::min(MAX_WIDTH / sheet.length, MAX_HEIGHT / sheet.width);
    let grid_w = (sheet.length * scale).round() as usize;
    let grid_h = (sheet.width * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    // Sheet border first
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &layout.placements {
        let sx = (p.x * scale).round() as usize;
        let sy = (p.y * scale).round() as usize;
        let sw = (p.placed_width * scale).round() as usize;
        let sh = (p.placed_height * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label = if p.rotated {
            format!("{}*", p.panel_id)
        } else {
            p.panel_id.clone()
        };
        let label_chars: Vec<char> = label.chars().collect();

        if sw > 2 && sh > 0 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let half = label_chars.len() / 2;
            let start_x = cx.saturating_sub(half);

            for (i, &ch) in label_chars.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn merge(existing: char, edge: char) -> char {
    match (existing, edge) {
        ('+', _) => '+',
        ('|', '-') | ('-', '|') => '+',
        _ => edge,
    }
}

#[allow(clippy::needless_range_loop)]
fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    for i in x..=x + w {
        if i >= cols {
            break;
        }
        for row in [y, y + h] {
            if row < rows {
                grid[row][i] = merge(grid[row][i], '-');
            }
        }
    }

    for j in y..=y + h {
        if j >= rows {
            break;
        }
        for col in [x, x + w] {
            if col < cols {
                grid[j][col] = merge(grid[j][col], '|');
            }
        }
    }

    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
