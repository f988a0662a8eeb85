use serde::{Deserialize, Serialize};

/// A movie in the catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
}

/// Fields supplied when adding a movie to the catalogue
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl NewMovie {
    /// Shorthand for a movie known only by its title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn into_movie(self, id: i64) -> Movie {
        Movie {
            id,
            title: self.title,
            genre: self.genre,
            release_year: self.release_year,
            description: self.description,
            poster_url: self.poster_url,
        }
    }
}

/// Orders movies for display: alphabetically by title, then by id
pub fn sort_by_title(movies: &mut [Movie]) {
    movies.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_title_breaks_ties_by_id() {
        let mut movies = vec![
            NewMovie::titled("Zodiac").into_movie(1),
            NewMovie::titled("Alien").into_movie(3),
            NewMovie::titled("Alien").into_movie(2),
        ];
        sort_by_title(&mut movies);
        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_new_movie_optional_fields_default() {
        let new: NewMovie = serde_json::from_str(r#"{"title":"Heat"}"#).unwrap();
        let movie = new.into_movie(9);
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.genre, None);
        assert_eq!(movie.release_year, None);
    }
}
